//! Interactive text menu over `UserService`.
//!
//! # Responsibility
//! - Prompt for and shape-check raw input before it reaches the service.
//! - Render service results and errors as human-readable text.
//!
//! # Invariants
//! - Service errors never end the loop; only end of input or I/O errors do.
//! - The existing-email lookup during create is a hint only. The store's
//!   unique index remains the authority and may still reject the insert.

use anyhow::Result;
use log::{error, warn};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;
use usercrud_core::{
    validate_age, ConstraintViolation, ServiceError, User, UserId, UserRepository, UserService,
};

/// Source of input lines; `None` signals end of input.
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Line source backed by a `rustyline` editor with history.
pub struct EditorSource {
    editor: DefaultEditor,
}

impl EditorSource {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineSource for EditorSource {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.editor.add_history_entry(line.as_str())?;
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct Menu<'a, R: UserRepository, L: LineSource, W: Write> {
    service: &'a UserService<R>,
    input: L,
    out: W,
}

impl<'a, R: UserRepository, L: LineSource, W: Write> Menu<'a, R, L, W> {
    pub fn new(service: &'a UserService<R>, input: L, out: W) -> Self {
        Self {
            service,
            input,
            out,
        }
    }

    /// Consumes the menu and returns its output sink.
    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs until the user picks `0` or input ends.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.print_menu()?;
            let Some(choice) = self.input.read_line("Choice: ")? else {
                break;
            };

            match choice.trim() {
                "1" => self.create_user()?,
                "2" => self.find_by_id()?,
                "3" => self.find_by_email()?,
                "4" => self.list_users()?,
                "5" => self.update_user()?,
                "6" => self.delete_user()?,
                "0" => break,
                other => writeln!(self.out, "Unknown choice `{other}`.")?,
            }
        }
        Ok(())
    }

    fn print_menu(&mut self) -> Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "=== Users ===")?;
        writeln!(self.out, "1. Create user")?;
        writeln!(self.out, "2. Find by id")?;
        writeln!(self.out, "3. Find by email")?;
        writeln!(self.out, "4. List all users")?;
        writeln!(self.out, "5. Update user")?;
        writeln!(self.out, "6. Delete user")?;
        writeln!(self.out, "0. Exit")?;
        Ok(())
    }

    fn create_user(&mut self) -> Result<()> {
        let name = loop {
            let Some(line) = self.input.read_line("Name: ")? else {
                return Ok(());
            };
            let name = line.trim().to_string();
            if !name.is_empty() {
                break name;
            }
            writeln!(self.out, "Name cannot be empty.")?;
        };

        let email = loop {
            let Some(line) = self.input.read_line("Email: ")? else {
                return Ok(());
            };
            let email = line.trim().to_string();
            if email.is_empty() {
                writeln!(self.out, "Email cannot be empty.")?;
                continue;
            }
            if !email.contains('@') {
                writeln!(self.out, "Email must contain '@'.")?;
                continue;
            }
            break email;
        };

        if !self.confirm_email_hint(&email)? {
            return Ok(());
        }

        let age = loop {
            let Some(line) = self.input.read_line("Age (blank to skip): ")? else {
                return Ok(());
            };
            let line = line.trim();
            if line.is_empty() {
                break None;
            }
            match line.parse::<i32>() {
                Ok(age) => match validate_age(age) {
                    Ok(()) => break Some(age),
                    Err(err) => writeln!(self.out, "{err}.")?,
                },
                Err(_) => writeln!(self.out, "Please enter a whole number.")?,
            }
        };

        match self.service.create_user(&name, &email, age) {
            Ok(user) => {
                writeln!(self.out, "User created.")?;
                writeln!(self.out, "{}", format_user(&user))?;
            }
            Err(err) => self.report("create", &err)?,
        }
        Ok(())
    }

    /// Warns when the email already looks taken; returns whether to go on.
    fn confirm_email_hint(&mut self, email: &str) -> Result<bool> {
        match self.service.get_user_by_email(email) {
            Ok(Some(_)) => {
                writeln!(self.out, "A user with email '{email}' already exists.")?;
                let answer = self.input.read_line("Continue anyway? (yes/no): ")?;
                Ok(matches!(answer, Some(answer) if answer.trim().eq_ignore_ascii_case("yes")))
            }
            Ok(None) => Ok(true),
            Err(err) => {
                warn!("event=email_hint module=cli status=skipped error={err}");
                Ok(true)
            }
        }
    }

    fn find_by_id(&mut self) -> Result<()> {
        let Some(id) = self.prompt_id("ID: ")? else {
            return Ok(());
        };
        match self.service.get_user_by_id(id) {
            Ok(Some(user)) => writeln!(self.out, "Found: {}", format_user(&user))?,
            Ok(None) => writeln!(self.out, "Not found.")?,
            Err(err) => self.report("find_by_id", &err)?,
        }
        Ok(())
    }

    fn find_by_email(&mut self) -> Result<()> {
        let Some(email) = self.input.read_line("Email: ")? else {
            return Ok(());
        };
        match self.service.get_user_by_email(&email) {
            Ok(Some(user)) => writeln!(self.out, "Found: {}", format_user(&user))?,
            Ok(None) => writeln!(self.out, "Not found.")?,
            Err(err) => self.report("find_by_email", &err)?,
        }
        Ok(())
    }

    fn list_users(&mut self) -> Result<()> {
        match self.service.get_all_users() {
            Ok(users) if users.is_empty() => writeln!(self.out, "No users.")?,
            Ok(users) => {
                for user in &users {
                    writeln!(self.out, "{}", format_user(user))?;
                }
            }
            Err(err) => self.report("list", &err)?,
        }
        Ok(())
    }

    fn update_user(&mut self) -> Result<()> {
        let Some(id) = self.prompt_id("ID to update: ")? else {
            return Ok(());
        };
        let current = match self.service.get_user_by_id(id) {
            Ok(Some(user)) => user,
            Ok(None) => {
                writeln!(self.out, "Not found.")?;
                return Ok(());
            }
            Err(err) => return self.report("update", &err),
        };

        let Some(name) = self.prompt_optional(&format!("New name ({}): ", current.name))? else {
            return Ok(());
        };
        let Some(email) = self.prompt_optional(&format!("New email ({}): ", current.email))?
        else {
            return Ok(());
        };
        let age_label = current
            .age
            .map_or_else(|| "none".to_string(), |age| age.to_string());
        let age = loop {
            let Some(age_text) = self.prompt_optional(&format!("New age ({age_label}): "))?
            else {
                return Ok(());
            };
            let Some(text) = age_text else {
                break None;
            };
            match text.parse::<i32>() {
                Ok(age) => match validate_age(age) {
                    Ok(()) => break Some(age),
                    Err(err) => writeln!(self.out, "{err}.")?,
                },
                Err(_) => writeln!(self.out, "Please enter a whole number.")?,
            }
        };

        match self
            .service
            .update_user(id, name.as_deref(), email.as_deref(), age)
        {
            Ok(user) => writeln!(self.out, "Updated: {}", format_user(&user))?,
            Err(err) => self.report("update", &err)?,
        }
        Ok(())
    }

    fn delete_user(&mut self) -> Result<()> {
        let Some(id) = self.prompt_id("ID to delete: ")? else {
            return Ok(());
        };
        let Some(answer) = self.input.read_line("Are you sure? (yes/no): ")? else {
            return Ok(());
        };
        if !answer.trim().eq_ignore_ascii_case("yes") {
            writeln!(self.out, "Cancelled.")?;
            return Ok(());
        }

        match self.service.delete_user(id) {
            Ok(()) => writeln!(self.out, "Deleted.")?,
            Err(err) => self.report("delete", &err)?,
        }
        Ok(())
    }

    /// Reads an id; `Ok(None)` when input ended or the text is not a number.
    fn prompt_id(&mut self, prompt: &str) -> Result<Option<UserId>> {
        let Some(line) = self.input.read_line(prompt)? else {
            return Ok(None);
        };
        match line.trim().parse::<UserId>() {
            Ok(id) => Ok(Some(id)),
            Err(_) => {
                writeln!(self.out, "Invalid id `{}`.", line.trim())?;
                Ok(None)
            }
        }
    }

    /// Outer `None` means input ended; inner `None` means keep the field.
    fn prompt_optional(&mut self, prompt: &str) -> Result<Option<Option<String>>> {
        Ok(self.input.read_line(prompt)?.map(|line| {
            let trimmed = line.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }))
    }

    fn report(&mut self, action: &str, err: &ServiceError) -> Result<()> {
        error!("event=cli_{action} module=cli status=error error={err}");
        writeln!(self.out, "Error: {}", describe_error(err))?;
        Ok(())
    }
}

/// Human-readable message for a service failure.
pub fn describe_error(err: &ServiceError) -> String {
    match err {
        ServiceError::Validation(inner) => format!("invalid input: {inner}"),
        ServiceError::NotFound(id) => format!("user {id} was not found"),
        ServiceError::Persistence(inner) => match inner.constraint_violation() {
            Some(ConstraintViolation::Unique) => {
                "this email is already used by another user".to_string()
            }
            Some(ConstraintViolation::NotNull | ConstraintViolation::Check) => {
                "required fields are missing or out of range".to_string()
            }
            _ => format!("storage failure: {inner}"),
        },
    }
}

fn format_user(user: &User) -> String {
    let id = user
        .id
        .map_or_else(|| "-".to_string(), |id| id.to_string());
    let age = user
        .age
        .map_or_else(|| "-".to_string(), |age| age.to_string());
    let created_at = user
        .created_at
        .map_or_else(|| "-".to_string(), |ms| ms.to_string());
    format!(
        "#{id} {} <{}> age={age} created_at_ms={created_at}",
        user.name, user.email
    )
}
