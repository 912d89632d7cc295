pub mod allocation;
pub mod analytics;
pub mod monte_carlo;
pub mod planning;
pub mod recommend;

/// Reference date for commands that take an optional `as_of`.
pub fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
