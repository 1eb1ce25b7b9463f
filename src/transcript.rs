/// Append-only history of every turn in one conversation, in both directions.
///
/// The joined form is what gets replayed after a reconnect, so entries are
/// never reordered or removed.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct Transcript {
    turns: Vec<String>,
}

impl Transcript {
    pub fn with_turns(turns: Vec<String>) -> Self {
        Self { turns }
    }

    pub fn push(&mut self, turn: impl Into<String>) {
        self.turns.push(turn.into());
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &str> + '_ {
        self.turns.iter().map(String::as_str)
    }

    pub fn turns(&self) -> &[String] {
        &self.turns
    }

    pub fn last(&self) -> Option<&str> {
        self.turns.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// All turns joined by newlines, sent as one message on a fresh connection.
    pub fn replay(&self) -> String {
        self.turns.join("\n")
    }
}
