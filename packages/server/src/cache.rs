use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

/// In-process fragment cache for expensive rendered responses.
///
/// Purely a performance optimization: a miss is always safe to recompute,
/// and invalidation is coarse (all fragments of a contest at once). Keys
/// are derived from the fragment name and the viewer, so viewers never see
/// each other's fragments.
pub struct FragmentCache {
    inner: Mutex<LruCache<String, String>>,
}

impl FragmentCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn scoreboard_key(contest_id: i32, reviewer: bool) -> String {
        let audience = if reviewer { "reviewer" } else { "public" };
        format!("scoreboard:{contest_id}:{audience}")
    }

    pub fn task_list_key(contest_id: i32, participant_id: Option<i32>) -> String {
        match participant_id {
            Some(id) => format!("tasks:{contest_id}:{id}"),
            None => format!("tasks:{contest_id}:anonymous"),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let mut cache = self.lock();
        cache.get(key).cloned()
    }

    pub fn set(&self, key: String, value: String) {
        let mut cache = self.lock();
        cache.put(key, value);
    }

    pub fn delete_many(&self, keys: &[String]) {
        let mut cache = self.lock();
        for key in keys {
            cache.pop(key);
        }
    }

    /// Drop every fragment belonging to a contest.
    pub fn invalidate_contest(&self, contest_id: i32) {
        let prefixes = [
            format!("scoreboard:{contest_id}:"),
            format!("tasks:{contest_id}:"),
        ];
        let keys: Vec<String> = {
            let cache = self.lock();
            cache
                .iter()
                .map(|(k, _)| k.clone())
                .filter(|k| prefixes.iter().any(|p| k.starts_with(p)))
                .collect()
        };
        self.delete_many(&keys);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, String>> {
        // A poisoned cache lock only ever holds cached strings; recover it.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_round_trip() {
        let cache = FragmentCache::new(8);
        cache.set("k".into(), "v".into());
        assert_eq!(cache.get("k").as_deref(), Some("v"));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn delete_many_removes_only_given_keys() {
        let cache = FragmentCache::new(8);
        cache.set("a".into(), "1".into());
        cache.set("b".into(), "2".into());
        cache.delete_many(&["a".to_string()]);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b").as_deref(), Some("2"));
    }

    #[test]
    fn invalidate_contest_drops_all_contest_fragments() {
        let cache = FragmentCache::new(8);
        cache.set(FragmentCache::scoreboard_key(1, false), "s".into());
        cache.set(FragmentCache::scoreboard_key(1, true), "sr".into());
        cache.set(FragmentCache::task_list_key(1, Some(7)), "t".into());
        cache.set(FragmentCache::scoreboard_key(2, false), "other".into());

        cache.invalidate_contest(1);

        assert_eq!(cache.get(&FragmentCache::scoreboard_key(1, false)), None);
        assert_eq!(cache.get(&FragmentCache::scoreboard_key(1, true)), None);
        assert_eq!(cache.get(&FragmentCache::task_list_key(1, Some(7))), None);
        assert_eq!(
            cache.get(&FragmentCache::scoreboard_key(2, false)).as_deref(),
            Some("other")
        );
    }

    #[test]
    fn evicts_least_recently_used_beyond_capacity() {
        let cache = FragmentCache::new(2);
        cache.set("a".into(), "1".into());
        cache.set("b".into(), "2".into());
        cache.set("c".into(), "3".into());
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("c").as_deref(), Some("3"));
    }
}
