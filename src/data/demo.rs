//! Built-in demo datasets
//!
//! Placeholder catalog content shown when a `DemoSubstitute` resource cannot be
//! loaded. None of it describes a real person or tenant.

use serde_json::{json, Value};

use super::{Collection, ResourceId};

/// Returns the demo dataset for `resource`
///
/// Resources without a demo dataset (anything tenant-sensitive) get an empty
/// collection.
pub fn dataset(resource: ResourceId) -> Collection {
    let raw = match resource {
        ResourceId::Courses => json!([
            {"id": "demo-course-1", "title": "Full-Stack Web Development", "status": "active", "durationWeeks": 24, "demo": true},
            {"id": "demo-course-2", "title": "Data Science Foundations", "status": "active", "durationWeeks": 16, "demo": true},
            {"id": "demo-course-3", "title": "UI/UX Design Essentials", "status": "draft", "durationWeeks": 12, "demo": true},
        ]),
        ResourceId::Teachers => json!([
            {"id": "demo-teacher-1", "name": "Demo Instructor A", "subject": "Web Development", "status": "active", "demo": true},
            {"id": "demo-teacher-2", "name": "Demo Instructor B", "subject": "Data Science", "status": "active", "demo": true},
        ]),
        ResourceId::Modules => json!([
            {"id": "demo-module-1", "courseId": "demo-course-1", "title": "HTML & CSS Basics", "order": 1, "demo": true},
            {"id": "demo-module-2", "courseId": "demo-course-1", "title": "JavaScript Fundamentals", "order": 2, "demo": true},
            {"id": "demo-module-3", "courseId": "demo-course-2", "title": "Python for Analysis", "order": 1, "demo": true},
        ]),
        ResourceId::Lessons => json!([
            {"id": "demo-lesson-1", "moduleId": "demo-module-1", "title": "Document Structure", "order": 1, "demo": true},
            {"id": "demo-lesson-2", "moduleId": "demo-module-1", "title": "Layout with Flexbox", "order": 2, "demo": true},
        ]),
        ResourceId::Jobs => json!([
            {"id": "demo-job-1", "title": "Junior Frontend Developer", "company": "Example Co.", "status": "open", "demo": true},
            {"id": "demo-job-2", "title": "Data Analyst Intern", "company": "Sample Labs", "status": "closed", "demo": true},
        ]),
        _ => return Collection::new(),
    };

    match raw {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(record) => Some(record),
                _ => None,
            })
            .collect(),
        _ => Collection::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{all_resources, FallbackMode};

    #[test]
    fn test_every_demo_resource_has_data() {
        for descriptor in all_resources() {
            if descriptor.fallback == FallbackMode::DemoSubstitute {
                assert!(!dataset(descriptor.id).is_empty(), "{} has no demo data", descriptor.id);
            }
        }
    }

    #[test]
    fn test_sensitive_resources_have_no_demo_data() {
        for descriptor in all_resources() {
            if descriptor.fallback == FallbackMode::HardFail {
                assert!(dataset(descriptor.id).is_empty(), "{} leaks demo data", descriptor.id);
            }
        }
    }

    #[test]
    fn test_demo_records_are_marked() {
        for record in dataset(ResourceId::Courses) {
            assert_eq!(record.get("demo"), Some(&Value::Bool(true)));
        }
    }

    #[test]
    fn test_dataset_is_stable() {
        assert_eq!(dataset(ResourceId::Teachers), dataset(ResourceId::Teachers));
    }
}
