//! Versioned user profiles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One version of a user's profile
///
/// Superseded versions are kept with `is_current = false` and never edited again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Owner
    pub email: String,
    /// Monotonic version number starting at 1
    pub version: u32,
    /// Whether this is the live version
    pub is_current: bool,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Target career
    #[serde(default)]
    pub career_goal: String,
    /// Current job title
    #[serde(default)]
    pub current_role: String,
    /// Experience level ("junior", "5 years", ...)
    #[serde(default)]
    pub experience: String,
    /// Known skills
    #[serde(default)]
    pub skills: Vec<String>,
    /// Education summary
    #[serde(default)]
    pub education: String,
    /// Interests
    #[serde(default)]
    pub interests: Vec<String>,
    /// When this version was written
    pub created_at: DateTime<Utc>,
    /// Store revision stamp
    #[serde(skip)]
    pub revision: u64,
}

impl Profile {
    /// First version of a profile
    #[must_use]
    pub fn new(email: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            email: email.into(),
            version: 1,
            is_current: true,
            name: String::new(),
            career_goal: String::new(),
            current_role: String::new(),
            experience: String::new(),
            skills: Vec::new(),
            education: String::new(),
            interests: Vec::new(),
            created_at: now,
            revision: 0,
        }
    }

    /// Builder-style career goal setter
    #[must_use]
    pub fn with_career_goal(mut self, goal: impl Into<String>) -> Self {
        self.career_goal = goal.into();
        self
    }

    /// Builder-style skills setter
    #[must_use]
    pub fn with_skills(mut self, skills: Vec<String>) -> Self {
        self.skills = skills;
        self
    }

    /// Whether a career goal is set
    #[inline]
    #[must_use]
    pub fn has_career_goal(&self) -> bool {
        !self.career_goal.trim().is_empty()
    }

    /// Sort key for this version
    #[must_use]
    pub fn sort_key(version: u32) -> String {
        format!("profile#v{version:06}")
    }

    /// Next version with `changes` applied
    #[must_use]
    pub fn next_version(&self, changes: &ProfileChanges, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.version = self.version + 1;
        next.is_current = true;
        next.created_at = now;
        next.revision = 0;
        changes.apply(&mut next);
        next
    }
}

/// Partial profile update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileChanges {
    /// New display name
    pub name: Option<String>,
    /// New career goal
    pub career_goal: Option<String>,
    /// New job title
    pub current_role: Option<String>,
    /// New experience level
    pub experience: Option<String>,
    /// New skill list
    pub skills: Option<Vec<String>>,
    /// New education summary
    pub education: Option<String>,
    /// New interests
    pub interests: Option<Vec<String>>,
}

impl ProfileChanges {
    /// Write every set field into `profile`
    pub fn apply(&self, profile: &mut Profile) {
        if let Some(v) = &self.name {
            profile.name.clone_from(v);
        }
        if let Some(v) = &self.career_goal {
            profile.career_goal.clone_from(v);
        }
        if let Some(v) = &self.current_role {
            profile.current_role.clone_from(v);
        }
        if let Some(v) = &self.experience {
            profile.experience.clone_from(v);
        }
        if let Some(v) = &self.skills {
            profile.skills.clone_from(v);
        }
        if let Some(v) = &self.education {
            profile.education.clone_from(v);
        }
        if let Some(v) = &self.interests {
            profile.interests.clone_from(v);
        }
    }

    /// Whether applying these changes to `profile` alters anything that
    /// generated roadmaps depend on
    #[must_use]
    pub fn affects_career(&self, profile: &Profile) -> bool {
        fn differs<T: PartialEq>(new: Option<&T>, old: &T) -> bool {
            new.is_some_and(|n| n != old)
        }
        differs(self.career_goal.as_ref(), &profile.career_goal)
            || differs(self.current_role.as_ref(), &profile.current_role)
            || differs(self.experience.as_ref(), &profile.experience)
            || differs(self.skills.as_ref(), &profile.skills)
            || differs(self.education.as_ref(), &profile.education)
            || differs(self.interests.as_ref(), &profile.interests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_version_bumps_and_applies() {
        let now = Utc::now();
        let v1 = Profile::new("a@b.c", now).with_career_goal("Data Scientist");
        let changes = ProfileChanges {
            name: Some("Ada".into()),
            ..ProfileChanges::default()
        };
        let v2 = v1.next_version(&changes, now);
        assert_eq!(v2.version, 2);
        assert_eq!(v2.name, "Ada");
        assert_eq!(v2.career_goal, "Data Scientist");
        assert!(!changes.affects_career(&v1));
    }

    #[test]
    fn career_goal_change_is_career_relevant() {
        let v1 = Profile::new("a@b.c", Utc::now()).with_career_goal("Data Scientist");
        let same = ProfileChanges {
            career_goal: Some("Data Scientist".into()),
            ..ProfileChanges::default()
        };
        let different = ProfileChanges {
            career_goal: Some("ML Engineer".into()),
            ..ProfileChanges::default()
        };
        assert!(!same.affects_career(&v1));
        assert!(different.affects_career(&v1));
    }

    #[test]
    fn sort_keys_order_by_version() {
        assert!(Profile::sort_key(2) < Profile::sort_key(10));
    }
}
