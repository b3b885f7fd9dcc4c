// Allowlist filtering of addressed fetch targets.
//
// Each axis is independent; an empty axis imposes no restriction and a
// target must satisfy every non-empty axis. The domain axis is a security
// boundary: a target on a host outside a non-empty domain allowlist is
// never handed to the scheduler, whatever the manifest claims.

use mpd::FetchTarget;

/// Representation-ID, MIME-type, and domain allowlists.
#[derive(Debug, Clone, Default)]
pub struct SelectionFilter {
    repr_ids: Vec<String>,
    mime_types: Vec<String>,
    domains: Vec<String>,
}

impl SelectionFilter {
    pub fn new(repr_ids: Vec<String>, mime_types: Vec<String>, domains: Vec<String>) -> Self {
        Self {
            repr_ids,
            mime_types,
            domains,
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.repr_ids.is_empty() && self.mime_types.is_empty() && self.domains.is_empty()
    }

    /// Whether `target` passes every supplied allowlist.
    pub fn matches(&self, target: &FetchTarget) -> bool {
        if !self.repr_ids.is_empty() && !self.repr_ids.iter().any(|id| *id == target.repr_id) {
            return false;
        }

        if !self.mime_types.is_empty() {
            let Some(mime) = target.mime_type.as_deref() else {
                return false;
            };
            if !self
                .mime_types
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(mime))
            {
                return false;
            }
        }

        if !self.domains.is_empty() {
            let Some(host) = target.url.host_str() else {
                return false;
            };
            if !self
                .domains
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(host))
            {
                return false;
            }
        }

        true
    }

    /// Partition `targets` into (selected, rejected), preserving order.
    pub fn split(&self, targets: Vec<FetchTarget>) -> (Vec<FetchTarget>, Vec<FetchTarget>) {
        targets.into_iter().partition(|t| self.matches(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use url::Url;

    fn target(url: &str, repr_id: &str, mime: Option<&str>) -> FetchTarget {
        let url = Url::parse(url).expect("valid url");
        FetchTarget {
            rel_path: PathBuf::from(url.path().trim_start_matches('/')),
            repr_id: repr_id.to_string(),
            mime_type: mime.map(str::to_string),
            url,
        }
    }

    #[test]
    fn empty_filter_passes_everything() {
        let filter = SelectionFilter::default();
        assert!(filter.is_unrestricted());
        assert!(filter.matches(&target("https://cdn.example/s.m4s", "v1", None)));
    }

    #[test]
    fn repr_id_axis_is_exact() {
        let filter = SelectionFilter::new(vec!["v1".into()], vec![], vec![]);
        assert!(filter.matches(&target("https://cdn.example/s.m4s", "v1", None)));
        assert!(!filter.matches(&target("https://cdn.example/s.m4s", "v10", None)));
    }

    #[test]
    fn mime_axis_requires_known_mime() {
        let filter = SelectionFilter::new(vec![], vec!["video/mp4".into()], vec![]);
        assert!(filter.matches(&target("https://cdn.example/s.m4s", "v1", Some("video/mp4"))));
        assert!(filter.matches(&target("https://cdn.example/s.m4s", "v1", Some("VIDEO/MP4"))));
        assert!(!filter.matches(&target("https://cdn.example/s.m4s", "v1", Some("audio/mp4"))));
        assert!(!filter.matches(&target("https://cdn.example/s.m4s", "v1", None)));
    }

    #[test]
    fn domain_axis_drops_foreign_hosts() {
        let filter = SelectionFilter::new(vec![], vec![], vec!["cdn.example".into()]);
        assert!(filter.matches(&target("https://cdn.example/s.m4s", "v1", None)));
        assert!(!filter.matches(&target("https://evil.example/s.m4s", "v1", None)));
    }

    #[test]
    fn axes_combine_with_logical_and() {
        let filter = SelectionFilter::new(
            vec!["v1".into()],
            vec!["video/mp4".into()],
            vec!["cdn.example".into()],
        );
        assert!(filter.matches(&target("https://cdn.example/s.m4s", "v1", Some("video/mp4"))));
        // Right host and MIME, wrong representation.
        assert!(!filter.matches(&target("https://cdn.example/s.m4s", "v2", Some("video/mp4"))));
        // Right representation and MIME, wrong host.
        assert!(!filter.matches(&target("https://evil.example/s.m4s", "v1", Some("video/mp4"))));
    }

    #[test]
    fn split_partitions_in_order() {
        let filter = SelectionFilter::new(vec!["v1".into()], vec![], vec![]);
        let targets = vec![
            target("https://cdn.example/1.m4s", "v1", None),
            target("https://cdn.example/2.m4s", "v2", None),
            target("https://cdn.example/3.m4s", "v1", None),
        ];

        let (selected, rejected) = filter.split(targets);
        assert_eq!(selected.len(), 2);
        assert_eq!(rejected.len(), 1);
        assert_eq!(selected[0].url.path(), "/1.m4s");
        assert_eq!(selected[1].url.path(), "/3.m4s");
        assert_eq!(rejected[0].url.path(), "/2.m4s");
    }
}
