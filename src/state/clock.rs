/// Render elapsed mission time as `M:SS`.
///
/// Minutes are not wrapped into hours, so an hour and a half reads `90:00`.
pub fn format_duration(total_seconds: u64) -> String {
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}
