use std::collections::HashSet;

use common::TasksGrouping;
use serde::{Deserialize, Serialize};

/// A task-opening policy attached to a contest.
///
/// Stored as tagged JSON on the `opening_policy` row. Several policies can
/// be attached at once; the effective open set is the union of their
/// outputs ([`union_open_tasks`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicySpec {
    /// Every task in the contest is open.
    AllOpen,
    /// Only tasks with a manual-open row (own or global) are open.
    Manual,
    /// Tasks unlock sequentially inside each category (or the flat list).
    /// The flag selects whose solves unlock the next task: everyone's, or
    /// only this participant's. It changes the audience of "solved", not
    /// the unlock logic.
    ByCategories {
        #[serde(default = "default_opens_for_all")]
        opens_for_all_participants: bool,
    },
    /// Until the participant's first correct attempt, only the very first
    /// task (or the first category) is open; afterwards everything is.
    Welcome,
}

fn default_opens_for_all() -> bool {
    true
}

/// Everything a policy may consult, loaded once per request.
///
/// Policies are pure functions over this context, so they are testable
/// without a database.
pub struct OpeningContext<'a> {
    pub grouping: TasksGrouping,
    /// Ordered task ids per group: one group per category in category
    /// order, or a single group for one-by-one contests.
    pub groups: &'a [Vec<i32>],
    /// Tasks solved (checked and correct) by this participant.
    pub solved_by_participant: &'a HashSet<i32>,
    /// Tasks solved by anyone in the contest.
    pub solved_by_anyone: &'a HashSet<i32>,
    /// Whether this participant has any correct attempt in the contest.
    pub has_any_correct: bool,
    /// Tasks with a manual-open row applying to this participant (their own
    /// rows plus global NULL-participant rows).
    pub manual_open: &'a HashSet<i32>,
}

impl OpeningContext<'_> {
    fn all_task_ids(&self) -> HashSet<i32> {
        self.groups.iter().flatten().copied().collect()
    }
}

/// Compute the set of open task ids under a single policy.
pub fn open_task_ids(policy: &PolicySpec, ctx: &OpeningContext<'_>) -> HashSet<i32> {
    match policy {
        PolicySpec::AllOpen => ctx.all_task_ids(),
        PolicySpec::Manual => ctx.manual_open.clone(),
        PolicySpec::ByCategories {
            opens_for_all_participants,
        } => {
            let solved = if *opens_for_all_participants {
                ctx.solved_by_anyone
            } else {
                ctx.solved_by_participant
            };
            let mut open = HashSet::new();
            for group in ctx.groups {
                let mut prev: Option<i32> = None;
                for &task_id in group {
                    if prev.is_none_or(|p| solved.contains(&p)) {
                        open.insert(task_id);
                    }
                    prev = Some(task_id);
                }
            }
            open
        }
        PolicySpec::Welcome => {
            if ctx.has_any_correct {
                return ctx.all_task_ids();
            }
            match ctx.grouping {
                // The whole first category is the welcome set.
                TasksGrouping::ByCategories => ctx
                    .groups
                    .first()
                    .map(|g| g.iter().copied().collect())
                    .unwrap_or_default(),
                // Just the first task.
                TasksGrouping::OneByOne => ctx
                    .groups
                    .first()
                    .and_then(|g| g.first())
                    .map(|&id| HashSet::from([id]))
                    .unwrap_or_default(),
            }
        }
    }
}

/// Union of all attached policies' outputs: a task is open if any policy
/// opens it.
pub fn union_open_tasks<'a, I>(policies: I, ctx: &OpeningContext<'_>) -> HashSet<i32>
where
    I: IntoIterator<Item = &'a PolicySpec>,
{
    let mut open = HashSet::new();
    for policy in policies {
        open.extend(open_task_ids(policy, ctx));
    }
    open
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(
        grouping: TasksGrouping,
        groups: &'a [Vec<i32>],
        solved_by_participant: &'a HashSet<i32>,
        solved_by_anyone: &'a HashSet<i32>,
        manual_open: &'a HashSet<i32>,
    ) -> OpeningContext<'a> {
        OpeningContext {
            grouping,
            groups,
            solved_by_participant,
            solved_by_anyone,
            has_any_correct: !solved_by_participant.is_empty(),
            manual_open,
        }
    }

    #[test]
    fn all_open_returns_every_task_across_groups() {
        let groups = vec![vec![1, 2], vec![3]];
        let empty = HashSet::new();
        let c = ctx(TasksGrouping::ByCategories, &groups, &empty, &empty, &empty);
        assert_eq!(
            open_task_ids(&PolicySpec::AllOpen, &c),
            HashSet::from([1, 2, 3])
        );
    }

    #[test]
    fn sequential_opens_only_first_task_before_any_solve() {
        let groups = vec![vec![1, 2, 3]];
        let empty = HashSet::new();
        let c = ctx(TasksGrouping::ByCategories, &groups, &empty, &empty, &empty);
        let policy = PolicySpec::ByCategories {
            opens_for_all_participants: true,
        };
        assert_eq!(open_task_ids(&policy, &c), HashSet::from([1]));
    }

    #[test]
    fn sequential_global_audience_unlocks_for_everyone() {
        let groups = vec![vec![1, 2, 3]];
        let empty = HashSet::new();
        // Someone (not this participant) solved task 1.
        let anyone = HashSet::from([1]);
        let c = ctx(TasksGrouping::ByCategories, &groups, &empty, &anyone, &empty);
        let policy = PolicySpec::ByCategories {
            opens_for_all_participants: true,
        };
        assert_eq!(open_task_ids(&policy, &c), HashSet::from([1, 2]));
    }

    #[test]
    fn sequential_per_participant_audience_only_unlocks_for_the_solver() {
        let groups = vec![vec![1, 2, 3]];
        let empty = HashSet::new();
        let anyone = HashSet::from([1]);
        let policy = PolicySpec::ByCategories {
            opens_for_all_participants: false,
        };

        // Viewer who did not solve task 1: still only the first task.
        let other = ctx(TasksGrouping::ByCategories, &groups, &empty, &anyone, &empty);
        assert_eq!(open_task_ids(&policy, &other), HashSet::from([1]));

        // The solver sees the next one.
        let own = HashSet::from([1]);
        let solver = ctx(TasksGrouping::ByCategories, &groups, &own, &anyone, &empty);
        assert_eq!(open_task_ids(&policy, &solver), HashSet::from([1, 2]));
    }

    #[test]
    fn sequential_respects_group_boundaries() {
        let groups = vec![vec![1, 2], vec![3, 4]];
        let empty = HashSet::new();
        let anyone = HashSet::from([1]);
        let c = ctx(TasksGrouping::ByCategories, &groups, &empty, &anyone, &empty);
        let policy = PolicySpec::ByCategories {
            opens_for_all_participants: true,
        };
        // Task 4 stays closed: each group starts with its own first task.
        assert_eq!(open_task_ids(&policy, &c), HashSet::from([1, 2, 3]));
    }

    #[test]
    fn manual_opens_exactly_the_granted_tasks() {
        let groups = vec![vec![1, 2, 3]];
        let empty = HashSet::new();
        let manual = HashSet::from([2]);
        let c = ctx(TasksGrouping::OneByOne, &groups, &empty, &empty, &manual);
        assert_eq!(open_task_ids(&PolicySpec::Manual, &c), HashSet::from([2]));
    }

    #[test]
    fn welcome_opens_first_task_until_first_solve() {
        let groups = vec![vec![1, 2]];
        let empty = HashSet::new();
        let c = ctx(TasksGrouping::OneByOne, &groups, &empty, &empty, &empty);
        assert_eq!(open_task_ids(&PolicySpec::Welcome, &c), HashSet::from([1]));

        // One correct attempt anywhere flips it to all-open.
        let own = HashSet::from([2]);
        let solved = ctx(TasksGrouping::OneByOne, &groups, &own, &own, &empty);
        assert_eq!(
            open_task_ids(&PolicySpec::Welcome, &solved),
            HashSet::from([1, 2])
        );
    }

    #[test]
    fn welcome_opens_whole_first_category() {
        let groups = vec![vec![1, 2], vec![3]];
        let empty = HashSet::new();
        let c = ctx(TasksGrouping::ByCategories, &groups, &empty, &empty, &empty);
        assert_eq!(
            open_task_ids(&PolicySpec::Welcome, &c),
            HashSet::from([1, 2])
        );
    }

    #[test]
    fn union_combines_policies() {
        let groups = vec![vec![1, 2, 3]];
        let empty = HashSet::new();
        let manual = HashSet::from([3]);
        let c = ctx(TasksGrouping::OneByOne, &groups, &empty, &empty, &manual);
        let policies = [
            PolicySpec::ByCategories {
                opens_for_all_participants: true,
            },
            PolicySpec::Manual,
        ];
        // Sequential opens 1, manual opens 3.
        assert_eq!(union_open_tasks(policies.iter(), &c), HashSet::from([1, 3]));
    }

    #[test]
    fn no_policies_means_nothing_is_open() {
        let groups = vec![vec![1, 2]];
        let empty = HashSet::new();
        let c = ctx(TasksGrouping::OneByOne, &groups, &empty, &empty, &empty);
        assert!(union_open_tasks([].iter(), &c).is_empty());
    }

    #[test]
    fn policy_spec_round_trips_through_tagged_json() {
        let policy = PolicySpec::ByCategories {
            opens_for_all_participants: false,
        };
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["type"], "by_categories");
        let parsed: PolicySpec = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, policy);

        // Omitted flag defaults to opening for everyone.
        let parsed: PolicySpec =
            serde_json::from_value(serde_json::json!({"type": "by_categories"})).unwrap();
        assert_eq!(
            parsed,
            PolicySpec::ByCategories {
                opens_for_all_participants: true
            }
        );
    }
}
