use crate::SessionId;

/// What discovery reports about an advertised session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionDescriptor {
    pub id: SessionId,
    pub name: String,
    pub current_players: usize,
    pub max_players: usize,
    pub region: String,
}

impl SessionDescriptor {
    pub fn is_full(&self) -> bool {
        self.current_players >= self.max_players
    }
}

/// Narrows the result of a session listing
#[derive(Clone, Debug, Default)]
pub struct SessionFilter {
    /// Case-insensitive substring of the session name
    pub name_contains: Option<String>,
    pub region: Option<String>,
    pub only_with_space: bool,
}

impl SessionFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn matches(&self, descriptor: &SessionDescriptor) -> bool {
        if let Some(fragment) = &self.name_contains {
            if !descriptor
                .name
                .to_lowercase()
                .contains(&fragment.to_lowercase())
            {
                return false;
            }
        }
        if let Some(region) = &self.region {
            if &descriptor.region != region {
                return false;
            }
        }
        !(self.only_with_space && descriptor.is_full())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Key;

    fn room(name: &str, current: usize, region: &str) -> SessionDescriptor {
        SessionDescriptor {
            id: SessionId::from_u64(1),
            name: name.to_string(),
            current_players: current,
            max_players: 4,
            region: region.to_string(),
        }
    }

    #[test]
    fn filter_combines_criteria() {
        let filter = SessionFilter {
            name_contains: Some("room".into()),
            region: Some("eu".into()),
            only_with_space: true,
        };
        assert!(filter.matches(&room("Room1", 1, "eu")));
        assert!(!filter.matches(&room("Room1", 4, "eu")));
        assert!(!filter.matches(&room("Room1", 1, "us")));
        assert!(!filter.matches(&room("Lobby", 1, "eu")));
        assert!(SessionFilter::any().matches(&room("Lobby", 4, "us")));
    }
}
