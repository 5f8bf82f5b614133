use super::super::domain::ApplicantRecord;
use super::policy::RiskCategory;

const LOW_DTI: f64 = 20.0;
const ELEVATED_DTI: f64 = 25.0;
const HIGH_DTI: f64 = 40.0;
const EXTREME_DTI: f64 = 50.0;

const EXCELLENT_UTILIZATION: f64 = 0.30;
const GOOD_UTILIZATION: f64 = 0.40;

const MODERATE_REVOL_UTIL: f64 = 40.0;
const HIGH_REVOL_UTIL: f64 = 60.0;
const EXTREME_REVOL_UTIL: f64 = 80.0;

const THIN_FILE_OPEN_ACCOUNTS: f64 = 8.0;
const BURDENSOME_LOAN_TO_INCOME: f64 = 0.4;
const LOWER_INCOME: f64 = 50_000.0;

/// Credit quality implied by the letter of the sub-grade label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GradeBand {
    Strong,
    Fair,
    Weak,
    Unrated,
}

impl GradeBand {
    fn from_label(label: &str) -> Self {
        match label.chars().next() {
            Some('A') => GradeBand::Strong,
            Some('B' | 'C') => GradeBand::Fair,
            Some('D'..='G') => GradeBand::Weak,
            _ => GradeBand::Unrated,
        }
    }
}

/// Attributes the checklists look at, with missing values already read as zero.
pub(crate) struct BorrowerSignals {
    loan_amnt: f64,
    annual_inc: f64,
    dti: f64,
    revol_util: f64,
    credit_utilization: f64,
    loan_to_income: f64,
    open_acc: f64,
    mort_acc: f64,
    bankruptcies: f64,
    sub_grade: String,
    grade: GradeBand,
}

impl BorrowerSignals {
    pub(crate) fn from_record(record: &ApplicantRecord) -> Self {
        let sub_grade = record.normalized_sub_grade();
        let grade = GradeBand::from_label(&sub_grade);
        Self {
            loan_amnt: finite_or_zero(record.loan_amnt),
            annual_inc: finite_or_zero(record.annual_inc),
            dti: finite_or_zero(record.dti),
            revol_util: finite_or_zero(record.revol_util),
            credit_utilization: finite_or_zero(record.credit_utilization_ratio()),
            loan_to_income: finite_or_zero(record.loan_to_income_ratio()),
            open_acc: finite_or_zero(record.open_acc),
            mort_acc: finite_or_zero(record.mort_acc),
            bankruptcies: finite_or_zero(record.pub_rec_bankruptcies),
            sub_grade,
            grade,
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Ordered reasoning for a tier: one sentence per condition that holds, then the tier summary.
pub(crate) fn reasoning_for(
    category: RiskCategory,
    probability: f64,
    signals: &BorrowerSignals,
) -> Vec<String> {
    let mut reasons = match category {
        RiskCategory::VeryLow | RiskCategory::Low => approval_checklist(signals),
        RiskCategory::Moderate => conditional_checklist(signals),
        RiskCategory::High => decline_checklist(signals),
        RiskCategory::VeryHigh => severe_decline_checklist(signals),
    };
    reasons.push(tier_summary(category, probability));
    reasons
}

fn approval_checklist(signals: &BorrowerSignals) -> Vec<String> {
    let mut reasons = Vec::new();

    // A zero reading means the attribute was absent, not that it was favourable.
    if signals.dti > 0.0 && signals.dti <= LOW_DTI {
        reasons.push(format!(
            "Low debt-to-income ratio ({:.2}%) leaves ample capacity for new repayments.",
            signals.dti
        ));
    }

    if signals.credit_utilization > 0.0 {
        if signals.credit_utilization < EXCELLENT_UTILIZATION {
            reasons.push(format!(
                "Low credit utilization ({:.2}%) indicates responsible credit management.",
                signals.credit_utilization * 100.0
            ));
        } else if signals.credit_utilization <= GOOD_UTILIZATION {
            reasons.push(format!(
                "Credit utilization ({:.2}%) reflects healthy credit habits.",
                signals.credit_utilization * 100.0
            ));
        }
    }

    if signals.grade == GradeBand::Strong {
        reasons.push(format!(
            "Sub-grade {} reflects strong creditworthiness.",
            signals.sub_grade
        ));
    }

    if signals.mort_acc >= 1.0 {
        reasons.push(format!(
            "{} suggests established financial responsibility.",
            counted(signals.mort_acc, "mortgage account", "mortgage accounts")
        ));
    }

    reasons
}

fn conditional_checklist(signals: &BorrowerSignals) -> Vec<String> {
    let mut reasons = Vec::new();

    if let Some(sentence) = debt_to_income_concern(signals) {
        reasons.push(sentence);
    }

    if signals.revol_util > HIGH_REVOL_UTIL {
        reasons.push(high_utilization(signals));
    } else if signals.revol_util > MODERATE_REVOL_UTIL {
        reasons.push(format!(
            "Revolving credit utilization ({:.2}%) is moderate, indicating reliance on available credit.",
            signals.revol_util
        ));
    }

    match signals.grade {
        GradeBand::Fair => reasons.push(format!(
            "Sub-grade {} is fair, leaving room for credit improvement.",
            signals.sub_grade
        )),
        GradeBand::Weak => reasons.push(weak_grade(signals)),
        GradeBand::Strong | GradeBand::Unrated => {}
    }

    if signals.open_acc < THIN_FILE_OPEN_ACCOUNTS {
        reasons.push(format!(
            "{} limit the depth of the credit history.",
            capitalize(&counted(signals.open_acc, "open credit line", "open credit lines"))
        ));
    }

    reasons
}

fn decline_checklist(signals: &BorrowerSignals) -> Vec<String> {
    let mut reasons = Vec::new();

    if let Some(sentence) = debt_to_income_concern(signals) {
        reasons.push(sentence);
    }

    if signals.revol_util > HIGH_REVOL_UTIL {
        reasons.push(high_utilization(signals));
    }

    if signals.grade == GradeBand::Weak {
        reasons.push(weak_grade(signals));
    }

    if signals.bankruptcies > 0.0 {
        reasons.push(bankruptcy_record(signals));
    }

    if let Some(sentence) = loan_burden(signals) {
        reasons.push(sentence);
    }

    reasons
}

fn severe_decline_checklist(signals: &BorrowerSignals) -> Vec<String> {
    let mut reasons = Vec::new();

    if signals.dti > EXTREME_DTI && signals.revol_util > EXTREME_REVOL_UTIL {
        reasons.push(format!(
            "Extremely high debt-to-income ratio ({:.2}%) combined with {:.2}% revolving utilization signals an inability to take on further debt.",
            signals.dti, signals.revol_util
        ));
    } else {
        if let Some(sentence) = debt_to_income_concern(signals) {
            reasons.push(sentence);
        }
        if signals.revol_util > HIGH_REVOL_UTIL {
            reasons.push(high_utilization(signals));
        }
    }

    if signals.bankruptcies > 1.0 {
        reasons.push(format!(
            "Multiple public record bankruptcies ({:.0}) indicate a severe history of financial difficulty.",
            signals.bankruptcies
        ));
    } else if signals.bankruptcies > 0.0 {
        reasons.push(bankruptcy_record(signals));
    }

    if signals.grade == GradeBand::Weak {
        reasons.push(weak_grade(signals));
    }

    if let Some(sentence) = loan_burden(signals) {
        reasons.push(sentence);
    }

    reasons
}

fn debt_to_income_concern(signals: &BorrowerSignals) -> Option<String> {
    if signals.dti > HIGH_DTI {
        Some(format!(
            "High debt-to-income ratio ({:.2}%) indicates significant financial strain and limited capacity for new debt.",
            signals.dti
        ))
    } else if signals.dti > ELEVATED_DTI {
        Some(format!(
            "Debt-to-income ratio ({:.2}%) is elevated, requiring careful consideration of new debt.",
            signals.dti
        ))
    } else {
        None
    }
}

fn high_utilization(signals: &BorrowerSignals) -> String {
    format!(
        "High revolving credit utilization ({:.2}%) suggests over-reliance on credit.",
        signals.revol_util
    )
}

fn weak_grade(signals: &BorrowerSignals) -> String {
    format!(
        "Sub-grade {} reflects significant credit risk.",
        signals.sub_grade
    )
}

fn bankruptcy_record(signals: &BorrowerSignals) -> String {
    format!(
        "{} on file indicates prior financial instability.",
        counted(
            signals.bankruptcies,
            "public record bankruptcy",
            "public record bankruptcies"
        )
    )
}

fn loan_burden(signals: &BorrowerSignals) -> Option<String> {
    if signals.loan_to_income > BURDENSOME_LOAN_TO_INCOME && signals.annual_inc < LOWER_INCOME {
        Some(format!(
            "The requested loan amount ({}) is high relative to the annual income ({}).",
            currency(signals.loan_amnt),
            currency(signals.annual_inc)
        ))
    } else {
        None
    }
}

fn tier_summary(category: RiskCategory, probability: f64) -> String {
    let percent = probability * 100.0;
    match category {
        RiskCategory::VeryLow => format!(
            "Very low probability of default ({percent:.1}%); recommended for approval with favorable terms."
        ),
        RiskCategory::Low => format!(
            "Low probability of default ({percent:.1}%); recommended for approval."
        ),
        RiskCategory::Moderate => format!(
            "Moderate probability of default ({percent:.1}%); approval recommended with a higher rate, a reduced amount, or stricter repayment terms."
        ),
        RiskCategory::High => format!(
            "High probability of default ({percent:.1}%); declined due to a combination of elevated risk factors."
        ),
        RiskCategory::VeryHigh => format!(
            "Very high probability of default ({percent:.1}%); declining is strongly advised to prevent losses."
        ),
    }
}

fn counted(count: f64, singular: &str, plural: &str) -> String {
    if count == 1.0 {
        format!("1 {singular}")
    } else {
        format!("{count:.0} {plural}")
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `$12,345.67`
fn currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}
