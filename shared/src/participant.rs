use crate::ParticipantId;

/// One connected peer within a session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub is_host: bool,
    /// Set only inside the process that this participant is running in; never
    /// replicated
    pub is_local: bool,
    pub is_ready: bool,
}

impl Participant {
    pub fn new(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_host: false,
            is_local: false,
            is_ready: false,
        }
    }

    pub fn host(mut self) -> Self {
        self.is_host = true;
        self
    }

    pub fn local(mut self) -> Self {
        self.is_local = true;
        self
    }

    pub fn ready(mut self, ready: bool) -> Self {
        self.is_ready = ready;
        self
    }

    /// The form of this participant that goes over the wire
    pub fn to_remote(&self) -> Self {
        Self {
            is_local: false,
            ..self.clone()
        }
    }
}
