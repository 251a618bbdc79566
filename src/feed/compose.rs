//! The compose modal: field validation and the submit state machine.
//!
//! ```text
//! Closed --open--> Open --submit--> Submitting --ok--> Closed (+ refetch)
//!                   ^                   |
//!                   +----- error -------+   (form kept, submit error shown)
//! ```
//!
//! Validation failures never leave `Open`.

/// Title length bounds in characters, after trimming.
pub const TITLE_MIN: usize = 5;
pub const TITLE_MAX: usize = 100;
/// Body length bounds in characters, after trimming.
pub const CONTENT_MIN: usize = 50;
pub const CONTENT_MAX: usize = 5000;
/// Body length at which the counter turns into a warning.
pub const CONTENT_WARN_AT: usize = 4500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComposeField {
    #[default]
    Title,
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldErrors {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

/// A post that passed validation. Fields are trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPost {
    pub title: String,
    pub content: String,
}

fn validate_length(label: &str, value: &str, min: usize, max: usize) -> Result<(), String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{} is required", label));
    }
    let len = trimmed.chars().count();
    if len < min {
        return Err(format!("{} must be at least {} characters", label, min));
    }
    if len > max {
        return Err(format!("{} must be at most {} characters", label, max));
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), String> {
    validate_length("Title", title, TITLE_MIN, TITLE_MAX)
}

pub fn validate_content(content: &str) -> Result<(), String> {
    validate_length("Content", content, CONTENT_MIN, CONTENT_MAX)
}

/// Validate both fields, reporting every failing field at once.
pub fn validate(title: &str, content: &str) -> Result<ValidPost, FieldErrors> {
    let errors = FieldErrors {
        title: validate_title(title).err(),
        content: validate_content(content).err(),
    };
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(ValidPost {
        title: title.trim().to_string(),
        content: content.trim().to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComposeState {
    #[default]
    Closed,
    Open,
    Submitting,
}

/// Why [`ComposeFlow::submit`] did not hand out a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitRejected {
    NotOpen,
    /// A submit is already in flight.
    InFlight,
    Invalid(FieldErrors),
}

#[derive(Debug, Default)]
pub struct ComposeFlow {
    state: ComposeState,
    title: String,
    content: String,
    focus: ComposeField,
    errors: FieldErrors,
    submit_error: Option<String>,
}

impl ComposeFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self) {
        if self.state == ComposeState::Closed {
            self.state = ComposeState::Open;
            self.focus = ComposeField::Title;
        }
    }

    /// Close and discard the form. Ignored while submitting; returns whether
    /// the modal actually closed.
    pub fn cancel(&mut self) -> bool {
        match self.state {
            ComposeState::Open => {
                self.reset();
                true
            }
            ComposeState::Closed | ComposeState::Submitting => false,
        }
    }

    /// Validate and move to `Submitting`. The returned post is what the
    /// caller should publish.
    pub fn submit(&mut self) -> Result<ValidPost, SubmitRejected> {
        match self.state {
            ComposeState::Closed => return Err(SubmitRejected::NotOpen),
            ComposeState::Submitting => return Err(SubmitRejected::InFlight),
            ComposeState::Open => {}
        }

        self.submit_error = None;
        match validate(&self.title, &self.content) {
            Ok(post) => {
                self.errors = FieldErrors::default();
                self.state = ComposeState::Submitting;
                Ok(post)
            }
            Err(errors) => {
                self.errors = errors.clone();
                Err(SubmitRejected::Invalid(errors))
            }
        }
    }

    /// Record the publish outcome. Success closes and clears the form;
    /// failure reopens it with the text intact. Returns `true` on success.
    pub fn complete_submit(&mut self, result: Result<(), String>) -> bool {
        if self.state != ComposeState::Submitting {
            return false;
        }
        match result {
            Ok(()) => {
                self.reset();
                true
            }
            Err(message) => {
                self.state = ComposeState::Open;
                self.submit_error = Some(message);
                false
            }
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    // ========================================================================
    // Editing
    // ========================================================================

    fn editable(&self) -> bool {
        self.state == ComposeState::Open
    }

    fn field_mut(&mut self) -> &mut String {
        match self.focus {
            ComposeField::Title => &mut self.title,
            ComposeField::Content => &mut self.content,
        }
    }

    /// Editing a field clears that field's error.
    fn touch(&mut self) {
        match self.focus {
            ComposeField::Title => self.errors.title = None,
            ComposeField::Content => self.errors.content = None,
        }
    }

    pub fn insert_char(&mut self, c: char) {
        if !self.editable() {
            return;
        }
        // Titles are single-line.
        if c == '\n' && self.focus == ComposeField::Title {
            self.focus = ComposeField::Content;
            return;
        }
        self.field_mut().push(c);
        self.touch();
    }

    pub fn insert_str(&mut self, s: &str) {
        for c in s.chars() {
            self.insert_char(c);
        }
    }

    pub fn backspace(&mut self) {
        if !self.editable() {
            return;
        }
        if self.field_mut().pop().is_some() {
            self.touch();
        }
    }

    pub fn switch_field(&mut self) {
        if !self.editable() {
            return;
        }
        self.focus = match self.focus {
            ComposeField::Title => ComposeField::Content,
            ComposeField::Content => ComposeField::Title,
        };
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> ComposeState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != ComposeState::Closed
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn focus(&self) -> ComposeField {
        self.focus
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    /// Characters typed into the body, as shown by the counter.
    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }

    pub fn counter_label(&self) -> String {
        format!("{}/{}", self.content_len(), CONTENT_MAX)
    }

    pub fn near_limit(&self) -> bool {
        self.content_len() >= CONTENT_WARN_AT
    }
}
