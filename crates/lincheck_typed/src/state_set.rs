use std::slice;

/// A set of states that a system could currently be in, free of duplicates with respect to
/// some state equality.
///
/// The only way to build one is [`StateSet::merge`], which is what makes
/// [`StateSet::same_states`] sound: comparing two duplicate-free sets of equal size in one
/// direction is enough to know that they match element for element.
///
/// `==` compares with [`StateSet::same_states`] under the states' own `==`, so the order in
/// which states were merged does not matter. Sets merged under a different equality should be
/// compared with `same_states` and that equality instead.
#[derive(Clone, Debug)]
pub struct StateSet<S>(Vec<S>);

impl<S> StateSet<S> {
    /// Deduplicates `states` under `equal`, keeping the first state of each equivalence class
    /// in the order given. Quadratic, as `equal` is an arbitrary predicate.
    pub fn merge(states: impl IntoIterator<Item = S>, equal: impl Fn(&S, &S) -> bool) -> Self {
        let mut unique: Vec<S> = Vec::new();
        for state in states {
            if !unique.iter().any(|u| equal(&state, u)) {
                unique.push(state);
            }
        }
        StateSet(unique)
    }

    /// Whether both sets hold the same states under `equal`, which must be the equality the
    /// sets were merged with.
    pub fn same_states(&self, other: &Self, equal: impl Fn(&S, &S) -> bool) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().all(|s1| other.0.iter().any(|s2| equal(s1, s2)))
    }

    /// Whether some state in the set is equal to `state` under `equal`.
    pub fn contains(&self, state: &S, equal: impl Fn(&S, &S) -> bool) -> bool {
        self.0.iter().any(|s| equal(s, state))
    }

    /// Renders the set as `{a, b, c}`, in the order in which states were merged.
    pub fn describe(&self, describe_state: impl Fn(&S) -> String) -> String {
        let descriptions: Vec<String> = self.0.iter().map(describe_state).collect();
        format!("{{{}}}", descriptions.join(", "))
    }

    /// The number of distinct states.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// An empty set is a dead end: no state explains the history so far.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates in merge order.
    pub fn iter(&self) -> slice::Iter<'_, S> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[S] {
        &self.0
    }

    /// Gives up the set, keeping merge order.
    pub fn into_vec(self) -> Vec<S> {
        self.0
    }
}

impl<S: PartialEq> PartialEq for StateSet<S> {
    fn eq(&self, other: &Self) -> bool {
        self.same_states(other, |s1, s2| s1 == s2)
    }
}

impl<'a, S> IntoIterator for &'a StateSet<S> {
    type Item = &'a S;
    type IntoIter = slice::Iter<'a, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
