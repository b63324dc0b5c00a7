//! Rendering of a voter's answer into the free-text summary sent back to
//! the chat the poll originated from.

/// Resolves selected option indices to their labels, preserving the order
/// the transport delivered them in. Indices outside the option range are
/// skipped rather than treated as an error; the transport never produces
/// them for a poll it created itself.
pub fn selected_labels(options: &[String], selected: &[usize]) -> Vec<String> {
    selected.iter().filter_map(|index| options.get(*index).cloned()).collect()
}

/// Joins labels with the literal connective `" and "`: no connective before
/// the first item and none trailing.
pub fn join_labels(labels: &[String]) -> String {
    labels.join(" and ")
}

/// The summary line identifying the voter, e.g. `Dana feels Good and Great!`.
pub fn voter_summary(voter: &str, labels: &[String]) -> String {
    format!("{voter} feels {}!", join_labels(labels))
}

#[cfg(test)]
mod tests {
    use super::{join_labels, selected_labels, voter_summary};

    fn options() -> Vec<String> {
        vec![
            "Good".to_owned(),
            "Really good".to_owned(),
            "Fantastic".to_owned(),
            "Great".to_owned(),
        ]
    }

    #[test]
    fn single_selection_has_no_connective() {
        assert_eq!(join_labels(&["Good".to_owned()]), "Good");
    }

    #[test]
    fn two_selections_join_with_and() {
        assert_eq!(join_labels(&["Good".to_owned(), "Great".to_owned()]), "Good and Great");
    }

    #[test]
    fn three_selections_join_pairwise_without_trailing_connective() {
        assert_eq!(
            join_labels(&["Good".to_owned(), "Great".to_owned(), "Fantastic".to_owned()]),
            "Good and Great and Fantastic"
        );
    }

    #[test]
    fn labels_keep_delivery_order() {
        assert_eq!(
            selected_labels(&options(), &[3, 0]),
            vec!["Great".to_owned(), "Good".to_owned()]
        );
    }

    #[test]
    fn out_of_range_indices_are_skipped() {
        assert_eq!(selected_labels(&options(), &[1, 9]), vec!["Really good".to_owned()]);
    }

    #[test]
    fn summary_line_embeds_voter_and_labels() {
        let labels = selected_labels(&options(), &[0, 3]);
        assert_eq!(voter_summary("Dana", &labels), "Dana feels Good and Great!");
    }
}
