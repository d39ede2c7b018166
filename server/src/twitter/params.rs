use serde::{Serialize, Serializer};

/// Kinds of posts the timeline endpoint can leave out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclude {
    Replies,
    Retweets,
}

impl AsRef<str> for Exclude {
    fn as_ref(&self) -> &str {
        match self {
            Exclude::Replies => "replies",
            Exclude::Retweets => "retweets",
        }
    }
}

/// Query parameters for `GET /2/users/:id/tweets`
#[derive(Debug, Clone, Serialize)]
pub struct TimelineParams {
    #[serde(serialize_with = "comma_separated", skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<Exclude>,
    #[serde(serialize_with = "comma_separated", skip_serializing_if = "Vec::is_empty")]
    pub expansions: Vec<&'static str>,
    #[serde(
        rename = "tweet.fields",
        serialize_with = "comma_separated",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tweet_fields: Vec<&'static str>,
    #[serde(
        rename = "media.fields",
        serialize_with = "comma_separated",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub media_fields: Vec<&'static str>,
    #[serde(
        rename = "user.fields",
        serialize_with = "comma_separated",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub user_fields: Vec<&'static str>,
}

impl TimelineParams {
    /// Original posts only, with author and engagement details expanded
    pub fn original_posts() -> Self {
        Self {
            exclude: vec![Exclude::Replies, Exclude::Retweets],
            expansions: vec!["author_id"],
            tweet_fields: vec!["lang", "public_metrics"],
            media_fields: vec!["type", "public_metrics"],
            user_fields: vec![
                "id",
                "name",
                "username",
                "verified",
                "public_metrics",
                "entities",
            ],
        }
    }
}

fn comma_separated<S, T>(values: &[T], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: AsRef<str>,
{
    let joined = values
        .iter()
        .map(|value| value.as_ref())
        .collect::<Vec<&str>>()
        .join(",");
    serializer.serialize_str(&joined)
}
