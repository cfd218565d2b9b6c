use crate::openai::{Message, Role};

/// Whether a displayed message is being edited, and the draft if so.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum EditState {
    #[default]
    Viewing,
    Editing {
        draft: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The edit was handed to the callback and editing ended
    Saved,
    /// The draft is blank, still editing
    Empty,
    /// The draft matches the message, still editing
    Unchanged,
    NotEditing,
}

/// Edit controls for a single message.
#[derive(Clone, Debug)]
pub struct MessageEditor {
    message: Message,
    state: EditState,
}

impl MessageEditor {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            state: EditState::Viewing,
        }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, EditState::Editing { .. })
    }

    pub fn draft(&self) -> Option<&str> {
        match &self.state {
            EditState::Editing { draft } => Some(draft),
            EditState::Viewing => None,
        }
    }

    /// Begins editing with the draft seeded from the message. Only
    /// messages the user wrote can be edited.
    pub fn start_edit(&mut self) -> bool {
        if self.message.role != Role::User {
            return false;
        }
        if !self.is_editing() {
            self.state = EditState::Editing {
                draft: self.message.content.clone(),
            };
        }
        true
    }

    pub fn update_draft(&mut self, text: impl Into<String>) {
        if let EditState::Editing { draft } = &mut self.state {
            *draft = text.into();
        }
    }

    pub fn can_save(&self) -> bool {
        match &self.state {
            EditState::Editing { draft } => {
                !draft.trim().is_empty() && *draft != self.message.content
            }
            EditState::Viewing => false,
        }
    }

    /// Replaces the message content with the draft and passes the
    /// updated message to `on_edit`. Blank or unchanged drafts are
    /// rejected without calling it.
    pub fn save<F>(&mut self, on_edit: F) -> SaveOutcome
    where
        F: FnOnce(Message),
    {
        let EditState::Editing { draft } = &self.state else {
            return SaveOutcome::NotEditing;
        };
        if draft.trim().is_empty() {
            return SaveOutcome::Empty;
        }
        if *draft == self.message.content {
            return SaveOutcome::Unchanged;
        }

        self.message.content = draft.clone();
        self.state = EditState::Viewing;
        on_edit(self.message.clone());

        SaveOutcome::Saved
    }

    /// Drops the draft, leaving the message as it was.
    pub fn cancel_edit(&mut self) {
        self.state = EditState::Viewing;
    }

    /// Picks up a new version of the message from the transcript. An
    /// open draft is reseeded from it.
    pub fn sync(&mut self, message: Message) {
        if let EditState::Editing { draft } = &mut self.state {
            *draft = message.content.clone();
        }
        self.message = message;
    }
}
