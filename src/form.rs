//! Form fields that validate themselves and carry their own alert message.
//!
//! A form owns its fields and hands out `FieldHandle`s so whoever drives the
//! form (the dashboard modal, a command, a server error handler) can trigger
//! validation or push a message onto a specific field.

use crate::task::{Priority, TaskDraft};
use crate::validation::{self, Rule, MIN_PASSWORD_LENGTH};

pub trait FieldHandle {
    fn name(&self) -> &str;
    fn value(&self) -> &str;
    /// Runs the field's rule, replacing its alert with the failure message
    /// (or clearing it). Returns whether the value is valid.
    fn validate(&mut self) -> bool;
    fn set_alert(&mut self, message: Option<String>);
    fn alert(&self) -> Option<&str>;
}

#[derive(Debug, Clone)]
pub struct Field {
    name: &'static str,
    value: String,
    rule: Rule,
    alert: Option<String>,
}

impl Field {
    pub fn new(name: &'static str, rule: Rule) -> Self {
        Self {
            name,
            value: String::new(),
            rule,
            alert: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn push(&mut self, ch: char) {
        self.value.push(ch);
    }

    pub fn pop(&mut self) {
        self.value.pop();
    }

    fn set_rule(&mut self, rule: Rule) {
        self.rule = rule;
    }
}

impl FieldHandle for Field {
    fn name(&self) -> &str {
        self.name
    }

    fn value(&self) -> &str {
        &self.value
    }

    fn validate(&mut self) -> bool {
        match validation::validate(&self.value, &self.rule) {
            Ok(_) => {
                self.alert = None;
                true
            }
            Err(err) => {
                self.alert = Some(err.to_string());
                false
            }
        }
    }

    fn set_alert(&mut self, message: Option<String>) {
        self.alert = message;
    }

    fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }
}

/// The create/edit modal form.
#[derive(Debug, Clone)]
pub struct TaskForm {
    pub name: Field,
    pub priority: Priority,
}

impl TaskForm {
    pub fn new(initial_name: &str, initial_priority: Priority) -> Self {
        Self {
            name: Field::new("taskName", Rule::RequiredText).with_value(initial_name),
            priority: initial_priority,
        }
    }

    /// Blank name, high priority.
    pub fn empty() -> Self {
        Self::new("", Priority::High)
    }

    pub fn toggle_priority(&mut self) {
        self.priority = self.priority.toggled();
    }

    /// Returns the draft only when the name validates; otherwise the name
    /// field carries the alert.
    pub fn submit(&mut self) -> Option<TaskDraft> {
        if !self.name.validate() {
            return None;
        }
        Some(TaskDraft {
            name: self.name.value().trim().to_string(),
            priority: self.priority,
        })
    }
}

/// Server feedback routed onto a form. `None` leaves that target untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomAlert {
    pub global: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginForm {
    pub email: Field,
    pub password: Field,
    global_alert: Option<String>,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            email: Field::new("email", Rule::RequiredEmail),
            password: Field::new(
                "password",
                Rule::RequiredPassword {
                    min_length: MIN_PASSWORD_LENGTH,
                },
            ),
            global_alert: None,
        }
    }
}

impl LoginForm {
    pub fn set_custom_alert(&mut self, alert: CustomAlert) {
        if let Some(global) = alert.global {
            self.global_alert = Some(global);
        }
        if let Some(email) = alert.email {
            self.email.set_alert(Some(email));
        }
    }

    pub fn global_alert(&self) -> Option<&str> {
        self.global_alert.as_deref()
    }

    pub fn all_fields_valid(&mut self) -> bool {
        let email_ok = self.email.validate();
        let password_ok = self.password.validate();
        email_ok && password_ok
    }

    pub fn submit(&mut self) -> Option<Credentials> {
        if !self.all_fields_valid() {
            return None;
        }
        Some(Credentials {
            email: self.email.value().trim().to_string(),
            password: self.password.value().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpData {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SignUpForm {
    pub first_name: Field,
    pub last_name: Field,
    pub email: Field,
    pub password: Field,
    pub confirm_password: Field,
    global_alert: Option<String>,
}

impl Default for SignUpForm {
    fn default() -> Self {
        let password_rule = Rule::RequiredPassword {
            min_length: MIN_PASSWORD_LENGTH,
        };
        Self {
            first_name: Field::new("firstName", Rule::RequiredText),
            last_name: Field::new("lastName", Rule::RequiredText),
            email: Field::new("email", Rule::RequiredEmail),
            password: Field::new("password", password_rule),
            confirm_password: Field::new(
                "confirmPassword",
                Rule::ConfirmedPassword {
                    original: String::new(),
                },
            ),
            global_alert: None,
        }
    }
}

impl SignUpForm {
    pub fn set_custom_alert(&mut self, alert: CustomAlert) {
        if let Some(global) = alert.global {
            self.global_alert = Some(global);
        }
        if let Some(email) = alert.email {
            self.email.set_alert(Some(email));
        }
    }

    pub fn global_alert(&self) -> Option<&str> {
        self.global_alert.as_deref()
    }

    /// Validates every field so each one shows its own alert.
    pub fn all_fields_valid(&mut self) -> bool {
        let original = self.password.value().to_string();
        self.confirm_password.set_rule(Rule::ConfirmedPassword { original });

        let fields: [&mut dyn FieldHandle; 5] = [
            &mut self.first_name,
            &mut self.last_name,
            &mut self.email,
            &mut self.password,
            &mut self.confirm_password,
        ];
        fields
            .into_iter()
            .map(|field| field.validate())
            .fold(true, |all, ok| all && ok)
    }

    pub fn submit(&mut self) -> Option<SignUpData> {
        if !self.all_fields_valid() {
            return None;
        }
        Some(SignUpData {
            first_name: self.first_name.value().trim().to_string(),
            last_name: self.last_name.value().trim().to_string(),
            email: self.email.value().trim().to_string(),
            password: self.password.value().to_string(),
        })
    }
}
