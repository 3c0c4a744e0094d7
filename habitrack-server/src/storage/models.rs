use crate::storage::schema::{check_ins, habits};
use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = habits)]
pub struct Habit {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub emoji: Option<String>,
    pub goal: i32,
    pub auto_complete: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = habits)]
#[diesel(treat_none_as_null = true)]
pub struct NewHabit<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub emoji: Option<&'a str>,
    pub goal: i32,
    pub auto_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = check_ins)]
#[diesel(belongs_to(Habit, foreign_key = habit_id))]
pub struct CheckIn {
    pub id: i32,
    pub habit_id: i32,
    pub date: NaiveDate,
    pub status: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = check_ins)]
pub struct NewCheckIn {
    pub habit_id: i32,
    pub date: NaiveDate,
    pub status: bool,
}
