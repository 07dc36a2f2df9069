use super::*;

impl Session {
    /// First-entry content for the current stage. Each effect is guarded by the transcript
    /// itself, so running this again for the same stage appends nothing.
    pub(super) fn run_entry_effects(&mut self) -> Result<(), DialogueError> {
        match self.stage {
            Stage::Prebrief => {
                if self.log.is_empty() {
                    let script = self.catalog.scripts().prebrief.clone();
                    self.say(Speaker::Narrator, script)?;
                }
            }
            Stage::Simulation => {
                if !self.log.has_speaker(Speaker::Antagonist) {
                    let opening = self.catalog.bank().opening_line().to_string();
                    self.say(Speaker::Antagonist, opening)?;
                }
            }
            Stage::Debrief => {
                let script = self.catalog.scripts().debrief.clone();
                if !self.log.contains(Speaker::Narrator, &script) {
                    self.say(Speaker::Narrator, script)?;
                }
            }
            Stage::Intro | Stage::End => {}
        }
        Ok(())
    }
}
