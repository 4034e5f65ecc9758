use chrono::{Local, NaiveDateTime, SubsecRound};

pub fn version_label() -> String {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_DESC: &str = env!("GIT_DESC");
    #[allow(clippy::const_is_empty)]
    if GIT_DESC.is_empty() {
        format!("vanno {VERSION}")
    } else {
        const GIT_DIRTY: &str = env!("GIT_DIRTY");
        let is_dirty = GIT_DIRTY == "true";
        format!(
            "vanno {VERSION} ({}{})",
            &GIT_DESC,
            if is_dirty { " DIRTY" } else { "" }
        )
    }
}

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Local time truncated to the precision of [`TIMESTAMP_FORMAT`](TIMESTAMP_FORMAT).
pub fn now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(6)
}

/// Local time with microseconds, e.g., `2024-03-01 17:04:11.532113`.
pub fn format_timestamp(t: &NaiveDateTime) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

#[test]
fn test_format_timestamp() {
    let t = NaiveDateTime::parse_from_str("2024-03-01 17:04:11.532113", TIMESTAMP_FORMAT).unwrap();
    assert_eq!(format_timestamp(&t), "2024-03-01 17:04:11.532113");
    assert!(version_label().starts_with("vanno"));
    let t = now();
    assert_eq!(
        NaiveDateTime::parse_from_str(&format_timestamp(&t), TIMESTAMP_FORMAT).unwrap(),
        t
    );
}
