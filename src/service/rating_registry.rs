use serde::{Deserialize, Serialize};

/// A rating as published by the CQC for a registered location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CqcRating {
    pub overall_rating: String,
    pub report_date: Option<String>,
    pub report_uri: Option<String>,
}

/// Outcome of a CQC rating lookup. The registry is a best-effort decoration:
/// an outage or an unknown provider never fails the surrounding request.
#[derive(Debug, Clone, PartialEq)]
pub enum RatingLookup {
    Found(CqcRating),
    Unavailable,
}

#[derive(Debug, Deserialize)]
struct CqcLocationResponse {
    #[serde(rename = "currentRatings")]
    current_ratings: Option<CqcCurrentRatings>,
}

#[derive(Debug, Deserialize)]
struct CqcCurrentRatings {
    overall: Option<CqcOverallRating>,
}

#[derive(Debug, Deserialize)]
struct CqcOverallRating {
    rating: Option<String>,
    #[serde(rename = "reportDate")]
    report_date: Option<String>,
    #[serde(rename = "reportLinkId")]
    report_link_id: Option<String>,
}

/// Client for the public CQC (Care Quality Commission) location API.
#[derive(Debug, Clone)]
pub struct RatingRegistry {
    base_url: String,
    client: reqwest::Client,
}

impl RatingRegistry {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub async fn lookup_location_rating(&self, cqc_location_id: &str) -> RatingLookup {
        let url = format!("{}/locations/{}", self.base_url, cqc_location_id);

        let response = match self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("CQC lookup for {} failed: {}", cqc_location_id, e);
                return RatingLookup::Unavailable;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                "CQC lookup for {} returned {}",
                cqc_location_id,
                response.status()
            );
            return RatingLookup::Unavailable;
        }

        match response.json::<CqcLocationResponse>().await {
            Ok(body) => extract_rating(&self.base_url, body),
            Err(e) => {
                tracing::warn!("CQC response for {} unreadable: {}", cqc_location_id, e);
                RatingLookup::Unavailable
            }
        }
    }
}

fn extract_rating(base_url: &str, body: CqcLocationResponse) -> RatingLookup {
    let overall = match body.current_ratings.and_then(|r| r.overall) {
        Some(overall) => overall,
        None => return RatingLookup::Unavailable,
    };

    match overall.rating {
        Some(rating) => RatingLookup::Found(CqcRating {
            overall_rating: rating,
            report_date: overall.report_date,
            report_uri: overall
                .report_link_id
                .map(|id| format!("{}/reports/{}", base_url, id)),
        }),
        None => RatingLookup::Unavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://api.service.cqc.org.uk/public/v1";

    #[test]
    fn parses_rating_from_response_body() {
        let body = r#"{"currentRatings":{"overall":{"rating":"Good","reportDate":"2023-11-02","reportLinkId":"abc123"}}}"#;
        let parsed: CqcLocationResponse = serde_json::from_str(body).unwrap();
        match extract_rating(BASE, parsed) {
            RatingLookup::Found(rating) => {
                assert_eq!(rating.overall_rating, "Good");
                assert_eq!(rating.report_date.as_deref(), Some("2023-11-02"));
                assert_eq!(
                    rating.report_uri.as_deref(),
                    Some("https://api.service.cqc.org.uk/public/v1/reports/abc123")
                );
            }
            RatingLookup::Unavailable => panic!("expected a rating"),
        }
    }

    #[test]
    fn tolerates_missing_ratings() {
        let body = r#"{"name":"Brightside Care Ltd"}"#;
        let parsed: CqcLocationResponse = serde_json::from_str(body).unwrap();
        assert_eq!(extract_rating(BASE, parsed), RatingLookup::Unavailable);
    }
}
