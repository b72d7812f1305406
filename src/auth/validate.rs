use crate::models::user::{ProfileUpdate, RegisterRequest};

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 2..=50;
const MAX_EMAIL_LEN: usize = 254;
const MIN_PASSWORD_LEN: usize = 8;

/// Check a registration form, reporting the first problem found.
/// Username and email are checked trimmed; the password as given.
pub fn check_registration(form: &RegisterRequest) -> Result<(), String> {
    username(form.username.trim())?;
    email(form.email.trim())?;
    password(&form.password)
}

/// Check the fields a profile update actually sets.
pub fn check_profile(update: &ProfileUpdate) -> Result<(), String> {
    if let Some(address) = &update.email {
        email(address.trim())?;
    }
    for (label, value) in [("First name", &update.first_name), ("Surname", &update.surname)] {
        if let Some(v) = value {
            let len = v.trim().chars().count();
            if !(1..=100).contains(&len) {
                return Err(format!("{label} must be between 1 and 100 characters"));
            }
        }
    }
    if update.position.as_ref().is_some_and(|p| p.trim().chars().count() > 100) {
        return Err("Position must be at most 100 characters".to_string());
    }
    match &update.password {
        Some(secret) => password(secret),
        None => Ok(()),
    }
}

fn username(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Username is required".to_string());
    }
    if !USERNAME_LEN.contains(&name.chars().count()) {
        return Err(format!(
            "Username must be between {} and {} characters",
            USERNAME_LEN.start(),
            USERNAME_LEN.end()
        ));
    }
    match name.chars().find(|c| !(c.is_alphanumeric() || *c == '_' || *c == '.')) {
        Some(bad) => Err(format!("Username may not contain '{bad}'")),
        None => Ok(()),
    }
}

fn email(address: &str) -> Result<(), String> {
    if address.is_empty() {
        return Err("Email is required".to_string());
    }
    if address.len() > MAX_EMAIL_LEN {
        return Err(format!("Email must be at most {MAX_EMAIL_LEN} characters"));
    }
    let valid = address
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid { Ok(()) } else { Err("Email address is not valid".to_string()) }
}

fn password(secret: &str) -> Result<(), String> {
    if secret.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!("Password must be at least {MIN_PASSWORD_LEN} characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_a_typical_evaluator_account() {
        assert_eq!(check_registration(&form(" b.santos_2 ", "ben@fda.gov.ph", "long enough")), Ok(()));
    }

    #[test]
    fn profile_checks_only_the_fields_being_set() {
        assert_eq!(check_profile(&ProfileUpdate::default()), Ok(()));
        let rename = ProfileUpdate { surname: Some("Reyes".into()), ..Default::default() };
        assert_eq!(check_profile(&rename), Ok(()));
        let blank = ProfileUpdate { first_name: Some("  ".into()), ..Default::default() };
        assert_eq!(check_profile(&blank).unwrap_err(), "First name must be between 1 and 100 characters");
        let weak = ProfileUpdate { password: Some("abc".into()), ..Default::default() };
        assert!(check_profile(&weak).is_err());
    }

    #[test]
    fn reports_the_first_failing_field() {
        assert_eq!(
            check_registration(&form("ben santos", "bad", "short")).unwrap_err(),
            "Username may not contain ' '"
        );
        assert_eq!(
            check_registration(&form("ben", "ben@localhost", "short")).unwrap_err(),
            "Email address is not valid"
        );
        assert_eq!(
            check_registration(&form("ben", "ben@fda.gov.ph", "short")).unwrap_err(),
            "Password must be at least 8 characters"
        );
        assert!(check_registration(&form("b", "ben@fda.gov.ph", "long enough")).is_err());
    }
}
