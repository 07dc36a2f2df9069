use contracts::{CharacterProfile, Speaker};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Roster {
    pub narrator: CharacterProfile,
    pub antagonist: CharacterProfile,
    pub trainee_label: String,
}

impl Roster {
    pub fn profile(&self, speaker: Speaker) -> Option<&CharacterProfile> {
        match speaker {
            Speaker::Narrator => Some(&self.narrator),
            Speaker::Antagonist => Some(&self.antagonist),
            Speaker::Trainee => None,
        }
    }

    /// Short transcript label ("Noa", "Sam", "You").
    pub fn label(&self, speaker: Speaker) -> &str {
        match self.profile(speaker) {
            Some(profile) => &profile.short_name,
            None => &self.trainee_label,
        }
    }

    pub fn display_name(&self, speaker: Speaker) -> &str {
        match self.profile(speaker) {
            Some(profile) => &profile.display_name,
            None => &self.trainee_label,
        }
    }
}
