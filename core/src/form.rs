//! Create/edit form state and its validation.
//!
//! # Design
//! One form type serves both screens. `FormMode` says whether the submit
//! creates a todo or edits an existing one; the rules differ only in that an
//! edit must actually change something.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::clock::Clock;
use crate::types::{NewTodo, Todo, TodoChanges};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(Todo),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("a date must be selected")]
    MissingDate,
    #[error("nothing was changed")]
    Unchanged,
}

/// A validated submit, ready to be handed to `TodoService::write`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub mode: FormMode,
    pub title: String,
    pub contents: String,
    pub date: DateTime<Utc>,
}

impl WriteRequest {
    pub fn new_todo(&self) -> NewTodo {
        NewTodo {
            title: self.title.clone(),
            contents: self.contents.clone(),
            date: self.date,
        }
    }

    pub fn changes(&self) -> TodoChanges {
        TodoChanges {
            title: Some(self.title.clone()),
            contents: Some(self.contents.clone()),
            date: Some(self.date),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoForm {
    mode: FormMode,
    pub title: String,
    pub contents: String,
    pub date: Option<DateTime<Utc>>,
}

impl TodoForm {
    /// Empty form for a new todo; no date is preselected.
    pub fn create() -> Self {
        Self {
            mode: FormMode::Create,
            title: String::new(),
            contents: String::new(),
            date: None,
        }
    }

    /// Form prefilled with `todo`'s fields.
    pub fn edit(todo: Todo) -> Self {
        Self {
            title: todo.title.clone(),
            contents: todo.contents.clone(),
            date: Some(todo.date),
            mode: FormMode::Edit(todo),
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    /// Whether an edit form differs from the todo it was opened for. Dates
    /// count as changed only when they land on another calendar day.
    pub fn is_changed(&self, clock: &dyn Clock) -> bool {
        match &self.mode {
            FormMode::Create => true,
            FormMode::Edit(original) => {
                let date_changed = self
                    .date
                    .is_some_and(|date| clock.local_day(date) != clock.local_day(original.date));
                self.title != original.title || self.contents != original.contents || date_changed
            }
        }
    }

    pub fn validate(&self, clock: &dyn Clock) -> Result<DateTime<Utc>, FormError> {
        if self.title.is_empty() {
            return Err(FormError::EmptyTitle);
        }
        let date = self.date.ok_or(FormError::MissingDate)?;
        if !self.is_changed(clock) {
            return Err(FormError::Unchanged);
        }
        Ok(date)
    }

    /// Drives the "done" button's enabled state.
    pub fn is_valid(&self, clock: &dyn Clock) -> bool {
        self.validate(clock).is_ok()
    }

    pub fn submit(&self, clock: &dyn Clock) -> Result<WriteRequest, FormError> {
        let date = self.validate(clock)?;
        Ok(WriteRequest {
            mode: self.mode.clone(),
            title: self.title.clone(),
            contents: self.contents.clone(),
            date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{Duration, TimeZone};

    fn clock() -> FixedClock {
        FixedClock::utc(Utc.with_ymd_and_hms(2025, 5, 11, 12, 0, 0).unwrap())
    }

    fn existing() -> Todo {
        Todo {
            id: "1".to_string(),
            title: "Read".to_string(),
            date: Utc.with_ymd_and_hms(2025, 5, 11, 9, 0, 0).unwrap(),
            contents: "chapter 3".to_string(),
            is_done: true,
        }
    }

    #[test]
    fn create_requires_title_and_date() {
        let clock = clock();
        let mut form = TodoForm::create();
        assert_eq!(form.validate(&clock), Err(FormError::EmptyTitle));

        form.title = "Buy milk".to_string();
        assert_eq!(form.validate(&clock), Err(FormError::MissingDate));

        form.date = Some(clock.now());
        let request = form.submit(&clock).unwrap();
        assert_eq!(request.mode, FormMode::Create);
        assert_eq!(request.new_todo().title, "Buy milk");
        assert!(request.new_todo().contents.is_empty());
    }

    #[test]
    fn unchanged_edit_is_rejected() {
        let clock = clock();
        let form = TodoForm::edit(existing());
        assert_eq!(form.submit(&clock), Err(FormError::Unchanged));
        assert!(!form.is_valid(&clock));
    }

    #[test]
    fn same_day_time_change_does_not_count() {
        let clock = clock();
        let mut form = TodoForm::edit(existing());
        form.date = Some(existing().date + Duration::hours(3));
        assert!(!form.is_changed(&clock));

        form.date = Some(existing().date + Duration::days(1));
        assert!(form.is_changed(&clock));
    }

    #[test]
    fn contents_change_alone_enables_submit() {
        let clock = clock();
        let mut form = TodoForm::edit(existing());
        form.contents = "chapter 4".to_string();
        let request = form.submit(&clock).unwrap();
        assert_eq!(request.mode, FormMode::Edit(existing()));
        assert_eq!(request.changes().contents.as_deref(), Some("chapter 4"));
    }
}
