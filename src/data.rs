use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TemplateCategory {
    Viral,
    Thread,
    Question,
    Story,
    Tips,
    Announcement,
    Promotion,
    Community,
    Reply,
    Quote,
    Poll,
    Media,
    News,
    Personal,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GlossaryCategory {
    Algorithm,
    Ranking,
    Engagement,
    Safety,
    Account,
    Content,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

#[allow(dead_code)]
impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Difficulty::Beginner => "初級",
            Difficulty::Intermediate => "中級",
            Difficulty::Advanced => "上級",
        }
    }

    /// Sort rank: beginner 1, intermediate 2, advanced 3.
    pub const fn rank(self) -> u8 {
        match self {
            Difficulty::Beginner => 1,
            Difficulty::Intermediate => 2,
            Difficulty::Advanced => 3,
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.code() == code)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EngagementLevel {
    Low,
    Medium,
    High,
}

#[allow(dead_code)]
impl EngagementLevel {
    pub const fn weight(self) -> u32 {
        match self {
            EngagementLevel::Low => 1,
            EngagementLevel::Medium => 2,
            EngagementLevel::High => 3,
        }
    }

    pub const fn code(self) -> &'static str {
        match self {
            EngagementLevel::Low => "low",
            EngagementLevel::Medium => "medium",
            EngagementLevel::High => "high",
        }
    }
}

/// Expected reaction per tracked engagement dimension.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngagementProfile {
    pub likes: EngagementLevel,
    pub replies: EngagementLevel,
    pub reposts: EngagementLevel,
}

#[allow(dead_code)]
impl EngagementProfile {
    pub fn score(&self) -> u32 {
        self.likes.weight() + self.replies.weight() + self.reposts.weight()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Template {
    pub id: String,
    pub title: String,
    pub category: TemplateCategory,
    pub difficulty: Difficulty,
    pub description: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub effects: Vec<String>,
    pub engagement: EngagementProfile,
    #[serde(default)]
    pub related_chapters: Vec<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GlossaryTerm {
    pub id: String,
    pub term: String,
    #[serde(default)]
    pub english: Option<String>,
    pub category: GlossaryCategory,
    pub short_description: String,
    pub description: String,
    #[serde(default)]
    pub related_terms: Vec<String>,
    #[serde(default)]
    pub related_chapters: Vec<u32>,
}
