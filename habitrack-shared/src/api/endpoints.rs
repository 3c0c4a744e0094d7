use super::API_PREFIX;

fn base_join(base: &str, path: &str) -> String {
    let b = base.trim_end_matches('/');
    let p = path.trim_start_matches('/');
    format!("{}/{}", b, p)
}

pub fn habits(base: &str) -> String {
    base_join(base, &format!("{}/habits", API_PREFIX))
}
pub fn habit(base: &str, habit_id: i32) -> String {
    base_join(base, &format!("{}/habits/{}", API_PREFIX, habit_id))
}
pub fn checkin(base: &str) -> String {
    base_join(base, &format!("{}/checkin", API_PREFIX))
}
pub fn monthly_progress(base: &str) -> String {
    base_join(base, &format!("{}/analytics/monthly-progress", API_PREFIX))
}
pub fn top_habits(base: &str) -> String {
    base_join(base, &format!("{}/analytics/top-habits", API_PREFIX))
}
pub fn completion_ratio(base: &str) -> String {
    base_join(base, &format!("{}/analytics/completion-ratio", API_PREFIX))
}
pub fn streaks(base: &str) -> String {
    base_join(base, &format!("{}/analytics/streaks", API_PREFIX))
}
