//! Merging the two plan calls into a [`DetailedPlan`]

use super::wire::{HighLevelPlanResponse, SubtopicsResponse, WireResource};
use indexmap::IndexMap;
use waypoint_model::{DetailedPlan, PlanPhase, PlanTopic, ResourceLink};

fn norm(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Combine the high-level plan with its subtopic expansion
///
/// Subtopics are matched by (phase, topic), falling back to the topic name
/// alone when the generator renamed a phase. Resources outside
/// `allowed_domains` or pointing at a homepage are dropped. Every topic
/// starts unassessed with `total_questions` questions.
#[must_use]
pub fn merge(
    career_title: &str,
    high: HighLevelPlanResponse,
    breakdown: &SubtopicsResponse,
    total_questions: u32,
    allowed_domains: &[String],
) -> DetailedPlan {
    let mut by_phase_topic: IndexMap<(String, String), &[String]> = IndexMap::new();
    let mut by_topic: IndexMap<String, &[String]> = IndexMap::new();
    for phase in &breakdown.subtopics_breakdown {
        for topic in &phase.topics {
            by_phase_topic.insert((norm(&phase.phase), norm(&topic.topic)), &topic.subtopics);
            by_topic.entry(norm(&topic.topic)).or_insert(&topic.subtopics);
        }
    }

    let high_level_roadmap = high
        .high_level_roadmap
        .into_iter()
        .map(|phase| {
            let phase_key = norm(&phase.phase);
            let topics = phase
                .topics
                .iter()
                .map(|t| t.name().to_string())
                .filter(|name| !name.is_empty())
                .map(|name| {
                    let topic_key = norm(&name);
                    let subtopics = by_phase_topic
                        .get(&(phase_key.clone(), topic_key.clone()))
                        .or_else(|| by_topic.get(&topic_key))
                        .map(|subs| {
                            subs.iter()
                                .map(|s| s.trim().to_string())
                                .filter(|s| !s.is_empty())
                                .collect()
                        })
                        .unwrap_or_default();
                    PlanTopic::new(name, subtopics, total_questions)
                })
                .collect();

            let resources = phase
                .resources
                .into_iter()
                .filter_map(|resource| {
                    let link = match resource {
                        WireResource::Url(url) => ResourceLink { title: String::new(), url },
                        WireResource::Link { title, url } => ResourceLink { title, url },
                    };
                    if is_allowed_resource(&link.url, allowed_domains) {
                        Some(link)
                    } else {
                        tracing::debug!("dropping resource {}", link.url);
                        None
                    }
                })
                .collect();

            PlanPhase {
                phase: phase.phase.trim().to_string(),
                duration: phase.duration,
                topics,
                resources,
                outcomes: phase.outcomes,
            }
        })
        .collect();

    let title = if high.career_title.trim().is_empty() {
        career_title.to_string()
    } else {
        high.career_title
    };

    DetailedPlan {
        career_title: title,
        high_level_roadmap,
        capstone_projects: high.capstone_projects,
    }
}

/// Whether `url` is a specific page on one of `allowed_domains`
///
/// Subdomains of an allowed domain are accepted. Bare homepages are not.
#[must_use]
pub fn is_allowed_resource(url: &str, allowed_domains: &[String]) -> bool {
    let url = url.trim();
    let Some(rest) = url.strip_prefix("https://").or_else(|| url.strip_prefix("http://")) else {
        return false;
    };
    let (authority, path) = match rest.find(['/', '?', '#']) {
        Some(split) => rest.split_at(split),
        None => (rest, ""),
    };
    let host = authority
        .rsplit('@')
        .next()
        .unwrap_or(authority)
        .split(':')
        .next()
        .unwrap_or_default()
        .to_lowercase();

    let domain_ok = allowed_domains.iter().any(|domain| {
        let domain = domain.trim().to_lowercase();
        host == domain || host.ends_with(&format!(".{domain}"))
    });
    let is_homepage = path.trim_end_matches('/').is_empty();

    domain_ok && !is_homepage
}
