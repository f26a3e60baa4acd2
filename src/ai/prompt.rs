//! Reusable prompts using Handlebars for templating. Handlebars adds
//! additional security controls since it can't do much out of the box
//! without registering your own helpers. This is ideal since email
//! content is untrusted and Handlebars forces you to add only what
//! you need.

use std::fmt;

use handlebars::{Handlebars, handlebars_helper, no_escape};

// A simple `inc` helper for use with `each` and `@index` so that
// there can be natural number sequences when rendering (instead of
// starting at 0).
handlebars_helper!(inc: |v: i64| format!("{}", v + 1));

#[derive(Debug)]
pub enum Prompt {
    ClassifyPolicy,
    ClassifyThread,
    ExtractThread,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

const CLASSIFY_POLICY_PROMPT: &str = r#"
{{policy}}

# Examples
{{#each examples}}

## Example {{inc @index}}

**Subject:** {{subject}}
**Body:**
{{body}}

**Answer:** {{answer}}
{{/each}}

# Answer format

Answer with a single JSON object and nothing else:
{"status": "ok" | "reply" | "drop", "reason": "<why, one sentence>", "text": "<reply text, only when status is reply>"}
"#;

const CLASSIFY_THREAD_PROMPT: &str = r"
The following conversation is in chronological order. Decide on the conversation as of the last message.
{{#each messages}}

### Message {{inc @index}}

{{#if from}}**From:** {{from}}
{{/if}}{{#if sent_at}}**Date:** {{sent_at}}
{{/if}}{{#if subject}}**Subject:** {{subject}}
{{/if}}**Body:**
{{body}}

---
{{/each}}
";

const EXTRACT_THREAD_PROMPT: &str = r#"
The email body below may quote earlier messages of the same conversation. List every quoted earlier message, newest first, exactly in the order they appear. Do not include the newest, unquoted message at the top.

Answer with a single JSON object and nothing else:
{"messages": [{"from": "<sender if known, else null>", "body": "<message text without quote markers>"}]}

# Email body

{{body}}
"#;

pub fn templates<'a>() -> Handlebars<'a> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    registry.register_escape_fn(no_escape);
    registry.register_helper("inc", Box::new(inc));
    registry
        .register_template_string(&Prompt::ClassifyPolicy.to_string(), CLASSIFY_POLICY_PROMPT)
        .expect("Failed to register template");
    registry
        .register_template_string(&Prompt::ClassifyThread.to_string(), CLASSIFY_THREAD_PROMPT)
        .expect("Failed to register template");
    registry
        .register_template_string(&Prompt::ExtractThread.to_string(), EXTRACT_THREAD_PROMPT)
        .expect("Failed to register template");
    registry
}
