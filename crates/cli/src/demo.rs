// crates/cli/src/demo.rs
//! Sample manuscripts for the demo run.

use pixelforge_server_jobs::Priority;
use serde_json::{json, Value};

const TITLES: &[(&str, &str)] = &[
    ("The Glowing Cube", "dark forest"),
    ("Lantern Keeper", "lighthouse on a cliff"),
    ("Clockwork Orchard", "brass garden"),
    ("Tidebound", "sunken city"),
    ("Ember Road", "volcanic pass"),
];

const MIXED: &[Priority] = &[
    Priority::Normal,
    Priority::High,
    Priority::Low,
    Priority::Critical,
];

/// Payload for the `index`-th demo job.
pub fn manuscript(index: usize) -> Value {
    let (title, background) = TITLES[index % TITLES.len()];
    json!({
        "manuscript": {
            "storyTitle": format!("{title} #{}", index + 1),
            "gameBackground": background,
            "characters": [{ "name": "Guide" }, { "name": "Wanderer" }],
            "missions": [{ "name": "Arrive" }, { "name": "Uncover the secret" }],
        },
        "params": { "style": "pixel_art", "emotion": "curious" }
    })
}

/// Priority for the `index`-th job: `fixed` if given, else a rotating mix.
pub fn priority(index: usize, fixed: Option<Priority>) -> Priority {
    fixed.unwrap_or(MIXED[index % MIXED.len()])
}
