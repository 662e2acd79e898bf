use std::sync::LazyLock;

use regex::Regex;

use super::error::{ApiError, FieldError};
use crate::models::habit::{CATEGORIES, FREQUENCIES, Reminder};

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{3,30}$").expect("username regex"));

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date regex"));

static COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("color regex"));

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("time regex"));

// ============================================================================
// Path/query-parameter validators (single failure, mapped straight to 400)
// ============================================================================

pub fn validate_habit_id(id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(
            "habitId",
            format!("Invalid habit ID: {}. ID must be a positive integer", id),
        ));
    }
    Ok(id)
}

pub fn validate_progress_id(id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(
            "id",
            format!("Invalid progress ID: {}. ID must be a positive integer", id),
        ));
    }
    Ok(id)
}

pub fn validate_limit(limit: u64) -> Result<u64, ApiError> {
    const MIN_LIMIT: u64 = 1;
    const MAX_LIMIT: u64 = 1000;

    if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::validation(
            "limit",
            format!(
                "Invalid limit: {}. Limit must be between {} and {}",
                limit, MIN_LIMIT, MAX_LIMIT
            ),
        ));
    }
    Ok(limit)
}

pub fn validate_date_param(date: &str) -> Result<&str, ApiError> {
    check_date("date", date).map_err(|e| ApiError::Validation(vec![e]))?;
    Ok(date)
}

// ============================================================================
// Body-field checks; callers collect every violation before failing
// ============================================================================

pub fn check_username(username: &str) -> Result<(), FieldError> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(FieldError::new(
            "username",
            "Username must be 3-30 characters of letters, digits, and underscores",
        ))
    }
}

pub fn check_email(email: &str) -> Result<(), FieldError> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(FieldError::new("email", "Email address is not valid"))
    }
}

pub fn check_password(password: &str) -> Result<(), FieldError> {
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if password.len() < 6 || !has_letter || !has_digit {
        return Err(FieldError::new(
            "password",
            "Password must be at least 6 characters and contain a letter and a digit",
        ));
    }
    Ok(())
}

pub fn check_date(field: &str, date: &str) -> Result<(), FieldError> {
    if !DATE_RE.is_match(date) {
        return Err(FieldError::new(field, "Date must be in YYYY-MM-DD format"));
    }

    // The regex admits impossible days like 2026-02-31; a real parse does not.
    if chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        return Err(FieldError::new(field, "Date is not a valid calendar day"));
    }
    Ok(())
}

pub fn check_value(value: f64) -> Result<(), FieldError> {
    if !value.is_finite() || value < 0.0 {
        return Err(FieldError::new(
            "value",
            "Value must be a non-negative number",
        ));
    }
    Ok(())
}

pub fn check_notes(notes: Option<&str>) -> Result<(), FieldError> {
    match notes {
        Some(n) if n.len() > 500 => Err(FieldError::new(
            "notes",
            "Notes must be 500 characters or less",
        )),
        _ => Ok(()),
    }
}

pub fn check_name(name: &str) -> Result<(), FieldError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(FieldError::new("name", "Name cannot be empty"));
    }
    if trimmed.len() > 100 {
        return Err(FieldError::new(
            "name",
            "Name must be 100 characters or less",
        ));
    }
    Ok(())
}

pub fn check_description(description: Option<&str>) -> Result<(), FieldError> {
    match description {
        Some(d) if d.len() > 500 => Err(FieldError::new(
            "description",
            "Description must be 500 characters or less",
        )),
        _ => Ok(()),
    }
}

pub fn check_category(category: &str) -> Result<(), FieldError> {
    if CATEGORIES.contains(&category) {
        Ok(())
    } else {
        Err(FieldError::new(
            "category",
            format!("Category must be one of: {}", CATEGORIES.join(", ")),
        ))
    }
}

pub fn check_frequency(field: &str, frequency: &str) -> Result<(), FieldError> {
    if FREQUENCIES.contains(&frequency) {
        Ok(())
    } else {
        Err(FieldError::new(
            field,
            format!("Frequency must be one of: {}", FREQUENCIES.join(", ")),
        ))
    }
}

pub fn check_target_value(target_value: i32) -> Result<(), FieldError> {
    if target_value < 1 {
        return Err(FieldError::new(
            "targetValue",
            "Target value must be at least 1",
        ));
    }
    Ok(())
}

pub fn check_unit(unit: Option<&str>) -> Result<(), FieldError> {
    match unit {
        Some(u) if u.len() > 20 => Err(FieldError::new(
            "unit",
            "Unit must be 20 characters or less",
        )),
        _ => Ok(()),
    }
}

pub fn check_color(color: &str) -> Result<(), FieldError> {
    if COLOR_RE.is_match(color) {
        Ok(())
    } else {
        Err(FieldError::new(
            "color",
            "Color must be a #rrggbb hex string",
        ))
    }
}

pub fn check_reminder(reminder: &Reminder) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if !TIME_RE.is_match(&reminder.start_time) {
        errors.push(FieldError::new(
            "reminder.startTime",
            "Reminder start time must be HH:MM",
        ));
    }
    if !TIME_RE.is_match(&reminder.end_time) {
        errors.push(FieldError::new(
            "reminder.endTime",
            "Reminder end time must be HH:MM",
        ));
    }
    if let Err(e) = check_frequency("reminder.frequency", &reminder.frequency) {
        errors.push(e);
    }
    if reminder.message.len() > 200 {
        errors.push(FieldError::new(
            "reminder.message",
            "Reminder message must be 200 characters or less",
        ));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_username() {
        assert!(check_username("alice").is_ok());
        assert!(check_username("a_b_3").is_ok());
        assert!(check_username("ab").is_err());
        assert!(check_username(&"x".repeat(31)).is_err());
        assert!(check_username("bad name").is_err());
        assert!(check_username("bad@name").is_err());
    }

    #[test]
    fn test_check_email() {
        assert!(check_email("a@b.co").is_ok());
        assert!(check_email("first.last@example.org").is_ok());
        assert!(check_email("no-at-sign").is_err());
        assert!(check_email("two@@b.co").is_err());
        assert!(check_email("spaces in@b.co").is_err());
    }

    #[test]
    fn test_check_password() {
        assert!(check_password("abc123").is_ok());
        assert!(check_password("a1b2c3d4").is_ok());
        assert!(check_password("short").is_err());
        assert!(check_password("letters").is_err());
        assert!(check_password("123456").is_err());
    }

    #[test]
    fn test_check_date() {
        assert!(check_date("date", "2026-08-07").is_ok());
        assert!(check_date("date", "2026-8-7").is_err());
        assert!(check_date("date", "07-08-2026").is_err());
        assert!(check_date("date", "2026-02-31").is_err());
        assert!(check_date("date", "not-a-date").is_err());
    }

    #[test]
    fn test_check_value() {
        assert!(check_value(0.0).is_ok());
        assert!(check_value(8.5).is_ok());
        assert!(check_value(-1.0).is_err());
        assert!(check_value(f64::NAN).is_err());
        assert!(check_value(f64::INFINITY).is_err());
    }

    #[test]
    fn test_check_color() {
        assert!(check_color("#2196f3").is_ok());
        assert!(check_color("#ABCDEF").is_ok());
        assert!(check_color("2196f3").is_err());
        assert!(check_color("#21f").is_err());
        assert!(check_color("#21zzf3").is_err());
    }

    #[test]
    fn test_check_reminder_times() {
        let mut reminder = Reminder::default();
        assert!(check_reminder(&reminder).is_empty());

        reminder.start_time = "25:00".to_string();
        reminder.message = "m".repeat(201);
        let errors = check_reminder(&reminder);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_validate_limit() {
        assert!(validate_limit(1).is_ok());
        assert!(validate_limit(1000).is_ok());
        assert!(validate_limit(0).is_err());
        assert!(validate_limit(1001).is_err());
    }

    #[test]
    fn test_validate_habit_id() {
        assert!(validate_habit_id(1).is_ok());
        assert!(validate_habit_id(0).is_err());
        assert!(validate_habit_id(-5).is_err());
    }
}
