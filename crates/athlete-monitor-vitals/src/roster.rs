//! Built-in squad used when no roster is supplied.

use crate::types::Subject;

/// Eight-player demo squad, ids 1 through 8.
pub fn default_roster() -> Vec<Subject> {
    vec![
        Subject::new(1, "John Smith", 10, "Forward"),
        Subject::new(2, "Carlos Rodriguez", 7, "Midfielder"),
        Subject::new(3, "Michael Johnson", 4, "Defender"),
        Subject::new(4, "Marcus Williams", 23, "Forward"),
        Subject::new(5, "David Chen", 19, "Midfielder"),
        Subject::new(6, "Thomas Müller", 13, "Defender"),
        Subject::new(7, "James Wilson", 1, "Goalkeeper"),
        Subject::new(8, "Lucas Silva", 21, "Midfielder"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SubjectId;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_and_sequential() {
        let roster = default_roster();
        let ids: HashSet<SubjectId> = roster.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), 8);
        assert!((1..=8).all(|i| ids.contains(&SubjectId(i))));
    }
}
