//! Form checks done before anything is sent. The backend stays authoritative.

use shared::protocol::{LoginRequest, NewTask, RegisterRequest, TaskPatch};

use crate::error::{ClientError, ClientResult};

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 500;

fn invalid(message: impl Into<String>) -> ClientError {
    ClientError::Validation(message.into())
}

fn check_title(title: &str) -> ClientResult<()> {
    if title.trim().is_empty() {
        return Err(invalid("title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(invalid(format!(
            "title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(())
}

fn check_description(description: &str) -> ClientResult<()> {
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(invalid(format!(
            "description must be at most {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    Ok(())
}

fn check_email(email: &str) -> ClientResult<()> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(invalid("email address is malformed")),
    }
}

pub fn validate_new_task(task: &NewTask) -> ClientResult<()> {
    check_title(&task.title)?;
    check_description(&task.description)
}

pub fn validate_patch(patch: &TaskPatch) -> ClientResult<()> {
    if patch.is_empty() {
        return Err(invalid("nothing to update"));
    }
    if let Some(title) = &patch.title {
        check_title(title)?;
    }
    if let Some(description) = &patch.description {
        check_description(description)?;
    }
    Ok(())
}

pub fn validate_login(request: &LoginRequest) -> ClientResult<()> {
    check_email(&request.email)?;
    if request.password.is_empty() {
        return Err(invalid("password must not be empty"));
    }
    Ok(())
}

pub fn validate_registration(request: &RegisterRequest) -> ClientResult<()> {
    if request.name.trim().is_empty() {
        return Err(invalid("name must not be empty"));
    }
    check_email(&request.email)?;
    if request.password.is_empty() {
        return Err(invalid("password must not be empty"));
    }
    Ok(())
}
