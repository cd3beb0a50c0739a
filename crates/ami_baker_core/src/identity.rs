//! Identity tags for baked images.
//!
//! Every image the handler creates carries three `cfn:` tags derived from the
//! stack and the logical resource. A later Delete finds the image again with a
//! tag filter built from the same three fields, so nothing about the image has
//! to be remembered between invocations.
//!
//! | Tag Key | Value |
//! |---------|-------|
//! | `cfn:stack-name` | Stack name from the resource properties |
//! | `cfn:stack-id` | Stack id (ARN) of the event |
//! | `cfn:logical-id` | Logical resource id of the event |

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

pub const TAG_PREFIX: &str = "cfn:";
pub const TAG_STACK_NAME: &str = "cfn:stack-name";
pub const TAG_STACK_ID: &str = "cfn:stack-id";
pub const TAG_LOGICAL_ID: &str = "cfn:logical-id";

/// Tag filters are matched against `tag:<key>` names.
pub const TAG_FILTER_PREFIX: &str = "tag:";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    pub name: String,
    pub values: Vec<String>,
}

impl TagFilter {
    pub fn for_tag(tag: &Tag) -> Self {
        Self {
            name: format!("{TAG_FILTER_PREFIX}{}", tag.key),
            values: vec![tag.value.clone()],
        }
    }

    /// Returns the tag key this filter constrains, if it is a tag filter.
    pub fn tag_key(&self) -> Option<&str> {
        self.name.strip_prefix(TAG_FILTER_PREFIX)
    }

    pub fn matches(&self, tags: &[Tag]) -> bool {
        let Some(key) = self.tag_key() else {
            return false;
        };
        tags.iter()
            .any(|tag| tag.key == key && self.values.iter().any(|value| *value == tag.value))
    }
}

/// Returns true when every filter matches the tag set.
pub fn matches_all(filters: &[TagFilter], tags: &[Tag]) -> bool {
    filters.iter().all(|filter| filter.matches(tags))
}

/// The idempotency key of one declared image resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIdentity {
    pub stack_name: String,
    pub stack_id: String,
    pub logical_resource_id: String,
}

impl ResourceIdentity {
    pub fn new(
        stack_name: impl Into<String>,
        stack_id: impl Into<String>,
        logical_resource_id: impl Into<String>,
    ) -> Self {
        Self {
            stack_name: stack_name.into(),
            stack_id: stack_id.into(),
            logical_resource_id: logical_resource_id.into(),
        }
    }

    pub fn identity_tags(&self) -> Vec<Tag> {
        vec![
            Tag::new(TAG_STACK_NAME, &self.stack_name),
            Tag::new(TAG_STACK_ID, &self.stack_id),
            Tag::new(TAG_LOGICAL_ID, &self.logical_resource_id),
        ]
    }

    pub fn tag_filters(&self) -> Vec<TagFilter> {
        self.identity_tags().iter().map(TagFilter::for_tag).collect()
    }
}

/// Merges caller tags with identity tags.
///
/// Identity tags always win on a key collision. Caller tags otherwise keep
/// their order; a caller key given twice keeps its last value at the position
/// of its first occurrence. Identity tags are appended after the caller tags.
pub fn merge_tags(caller_tags: &[Tag], identity_tags: &[Tag]) -> Vec<Tag> {
    let reserved: HashSet<&str> = identity_tags.iter().map(|tag| tag.key.as_str()).collect();

    let mut last_values: HashMap<&str, &str> = HashMap::new();
    for tag in caller_tags {
        last_values.insert(tag.key.as_str(), tag.value.as_str());
    }

    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(caller_tags.len() + identity_tags.len());
    for tag in caller_tags {
        let key = tag.key.as_str();
        if reserved.contains(key) || !seen.insert(key) {
            continue;
        }
        merged.push(Tag::new(key, last_values[key]));
    }
    merged.extend(identity_tags.iter().cloned());
    merged
}
