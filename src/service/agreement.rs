use chrono::NaiveDate;
use sqlx::types::BigDecimal;
use std::fmt::Write;

use crate::models::caremodel::NightType;

/// The six standard terms every rate agreement carries, in fixed order.
const STANDARD_TERMS: [&str; 6] = [
    "Either party may cancel this agreement with 14 days' written notice.",
    "Care hours are billed weekly in arrears via approved timesheets.",
    "The hourly rate above is locked for the duration of this agreement and may not be varied unilaterally.",
    "CareBridge acts solely as an introductory intermediary and accepts no liability for the delivery of care.",
    "The agency confirms that all assigned carers hold valid insurance and enhanced DBS clearance.",
    "Any safeguarding concern must be reported to the relevant local authority and to CareBridge without delay.",
];

/// Everything the agreement template needs, captured at bid acceptance so the
/// rendered text is an immutable snapshot.
#[derive(Debug, Clone)]
pub struct AgreementContext {
    pub account_holder_name: String,
    pub account_holder_address: String,
    pub recipient_name: String,
    pub recipient_dob: NaiveDate,
    pub recipient_address: String,
    pub recipient_relationship: String,
    pub agency_name: String,
    pub cqc_provider_id: Option<String>,
    pub hourly_rate: BigDecimal,
    pub overnight_rate: Option<BigDecimal>,
    pub nights_per_week: Option<i32>,
    pub night_type: Option<NightType>,
    pub hours_per_week: BigDecimal,
    pub frequency: String,
    pub start_date: Option<NaiveDate>,
    pub care_types: Vec<String>,
}

/// Deterministic render: identical context always yields identical text.
pub fn render_agreement_text(ctx: &AgreementContext) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "CARE SERVICES RATE AGREEMENT");
    let _ = writeln!(out);
    let _ = writeln!(out, "Account holder: {}", ctx.account_holder_name);
    let _ = writeln!(out, "Account holder address: {}", ctx.account_holder_address);
    let _ = writeln!(out);
    let _ = writeln!(out, "Care recipient: {}", ctx.recipient_name);
    let _ = writeln!(out, "Date of birth: {}", ctx.recipient_dob.format("%d %B %Y"));
    let _ = writeln!(out, "Address: {}", ctx.recipient_address);
    let _ = writeln!(
        out,
        "Relationship to account holder: {}",
        ctx.recipient_relationship
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Care agency: {}", ctx.agency_name);
    let _ = writeln!(
        out,
        "CQC provider ID: {}",
        ctx.cqc_provider_id.as_deref().unwrap_or("not registered")
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Agreed hourly rate: \u{a3}{} per hour", ctx.hourly_rate.round(2));
    let _ = writeln!(out, "Care hours: {} hours per week", ctx.hours_per_week);
    let _ = writeln!(out, "Frequency: {}", ctx.frequency);

    if let (Some(nights), Some(rate)) = (ctx.nights_per_week, ctx.overnight_rate.as_ref()) {
        let night_type = ctx
            .night_type
            .map(|t| t.to_str().to_string())
            .unwrap_or_else(|| "unspecified".to_string());
        let _ = writeln!(out);
        let _ = writeln!(out, "Overnight care: {} nights per week ({})", nights, night_type);
        let _ = writeln!(out, "Overnight rate: \u{a3}{} per night", rate.round(2));
    }

    let _ = writeln!(out);
    match ctx.start_date {
        Some(date) => {
            let _ = writeln!(out, "Start date: {}", date.format("%d %B %Y"));
        }
        None => {
            let _ = writeln!(out, "Start date: to be confirmed");
        }
    }
    let _ = writeln!(out, "Care types: {}", ctx.care_types.join(", "));
    let _ = writeln!(out);
    let _ = writeln!(out, "STANDARD TERMS");
    for (i, term) in STANDARD_TERMS.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, term);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_context() -> AgreementContext {
        AgreementContext {
            account_holder_name: "Sarah Crane".to_string(),
            account_holder_address: "12 Elm Road, Leeds".to_string(),
            recipient_name: "Edith Crane".to_string(),
            recipient_dob: NaiveDate::from_ymd_opt(1941, 3, 2).unwrap(),
            recipient_address: "4 Larch Way, Leeds".to_string(),
            recipient_relationship: "Mother".to_string(),
            agency_name: "Brightside Care Ltd".to_string(),
            cqc_provider_id: Some("1-101234567".to_string()),
            hourly_rate: BigDecimal::from_str("21.50").unwrap(),
            overnight_rate: None,
            nights_per_week: None,
            night_type: None,
            hours_per_week: BigDecimal::from(14),
            frequency: "weekly".to_string(),
            start_date: None,
            care_types: vec!["Personal Care".to_string(), "Companionship".to_string()],
        }
    }

    #[test]
    fn render_is_deterministic() {
        let ctx = sample_context();
        assert_eq!(render_agreement_text(&ctx), render_agreement_text(&ctx));
    }

    #[test]
    fn render_includes_all_required_fields() {
        let text = render_agreement_text(&sample_context());
        assert!(text.contains("Sarah Crane"));
        assert!(text.contains("12 Elm Road, Leeds"));
        assert!(text.contains("Edith Crane"));
        assert!(text.contains("02 March 1941"));
        assert!(text.contains("Mother"));
        assert!(text.contains("Brightside Care Ltd"));
        assert!(text.contains("1-101234567"));
        assert!(text.contains("\u{a3}21.50 per hour"));
        assert!(text.contains("14 hours per week"));
        assert!(text.contains("weekly"));
        assert!(text.contains("Start date: to be confirmed"));
        assert!(text.contains("Personal Care, Companionship"));
    }

    #[test]
    fn render_carries_six_numbered_terms() {
        let text = render_agreement_text(&sample_context());
        for i in 1..=6 {
            assert!(text.contains(&format!("{}. ", i)), "missing term {}", i);
        }
        assert!(!text.contains("7. "));
    }

    #[test]
    fn overnight_section_only_when_present() {
        let mut ctx = sample_context();
        assert!(!render_agreement_text(&ctx).contains("Overnight care:"));

        ctx.nights_per_week = Some(3);
        ctx.night_type = Some(NightType::Waking);
        ctx.overnight_rate = Some(BigDecimal::from(95));
        let text = render_agreement_text(&ctx);
        assert!(text.contains("Overnight care: 3 nights per week (waking)"));
        assert!(text.contains("\u{a3}95.00 per night"));
    }

    #[test]
    fn confirmed_start_date_variant() {
        let mut ctx = sample_context();
        ctx.start_date = NaiveDate::from_ymd_opt(2024, 6, 3);
        let text = render_agreement_text(&ctx);
        assert!(text.contains("Start date: 03 June 2024"));
        assert!(!text.contains("to be confirmed"));
    }
}
