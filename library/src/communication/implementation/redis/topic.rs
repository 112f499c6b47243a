//! Translation between slash separated topics and Redis channel names
//!
//! Redis channels use `.` as level separator and glob style `*` wildcards whereas
//! topics are written with `/` separators and `#`/`+` wildcards.

/// Converts a topic into the Redis channel naming scheme
pub fn to_redis_channel(topic: &str) -> String {
    topic
        .chars()
        .map(|c| match c {
            '/' => '.',
            '#' | '+' => '*',
            c => c,
        })
        .collect()
}

/// Converts a Redis channel name back into a topic
pub fn from_redis_channel(channel: &str) -> String {
    channel.replace('.', "/")
}

/// Whether a channel name has to be subscribed as a pattern
pub fn is_pattern(channel: &str) -> bool {
    channel.contains('*')
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn convert_separators_and_wildcards() {
        assert_eq!(to_redis_channel("edgex/xrt/response/#"), "edgex.xrt.response.*");
        assert_eq!(to_redis_channel("status/+/online"), "status.*.online");
        assert_eq!(to_redis_channel("plain"), "plain");
    }

    #[test]
    fn convert_received_channels_back() {
        assert_eq!(from_redis_channel("edgex.xrt.response.node-1"), "edgex/xrt/response/node-1");
    }

    #[test]
    fn detect_patterns() {
        assert!(is_pattern(&to_redis_channel("a/#")));
        assert!(!is_pattern(&to_redis_channel("a/b")));
    }
}
