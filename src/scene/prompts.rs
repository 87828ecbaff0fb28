//! Scene report prompt templates

use crate::ai::{Prompt, PromptBuilder};

fn system() -> String {
    PromptBuilder::new()
        .role("Unity Animator and Programmer", "documenting Unity timeline scenes")
        .objectives(&[
            "Be complete and structurally precise",
            "Keep tracks and clips in their original timeline order",
        ])
        .build()
}

const TIMELINE_EXAMPLE: &str = "\
## Track 1 (Audio Track)
**ROP_Animation_Addition_EN** (0.00s → 32.60s) (AudioPlayableAsset)

## Track 2 (Animator Timeline Track)
**Groups Show** (0.00s → 0.98s) (Currency Groups)
**Init** (0.00s → 1.00s) (Currency Setup)";

pub fn timeline_report(scene_json: &str) -> Prompt {
    let user = PromptBuilder::new()
        .section(
            "Scene",
            "Consider the input below as a Unity animation scene with tracks and clips:",
        )
        .code("json", scene_json)
        .custom(
            "Extract the animation timeline as a simple Markdown report:\n\
             - Group clips by track number and track type (## Track 1 (Audio Track)).\n\
             - One line per clip: **Clip Name** (start → end) (Game Object).\n\
             - Times in seconds with 2 decimals.\n\
             - Use (AudioPlayableAsset) as the game object of audio clips.\n\
             - Do not include scripts, triggers or other technical details.",
        )
        .section("Example", TIMELINE_EXAMPLE)
        .build();

    Prompt::new(system()).user(user)
}

const TABLE_TEMPLATE: &str = "\
# Tracks and Clips - [Animation Name]

| Track | Clip | Clip Name | Start (s) | End (s) | Duration (s) |
|-------|------|-----------|-----------|---------|--------------|
| **Track 1: Audio Track** | 1 | Clip_Name | X.XX | Y.YY | Z.ZZ |
| | 2 | Clip_Name | X.XX | Y.YY | Z.ZZ |

## Track Summary
- **Track 1 (Audio)**: X clips, total duration Y.Ys";

pub fn summary_table(timeline_report: &str) -> Prompt {
    let user = PromptBuilder::new()
        .section("Timeline report", timeline_report)
        .custom(
            "For every `## Track X` section, extract each clip name (text between `**`), \
             its start and end time, and compute its duration. Generate a Markdown table \
             with exactly this structure:",
        )
        .code("markdown", TABLE_TEMPLATE)
        .build();

    Prompt::new(system()).user(user)
}
