use super::sendmail::send_email;

pub async fn send_welcome_email(
    to_email: &str,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let subject = "Welcome to CareBridge";
    let template_path = "src/mail/templates/Welcome-email.html";
    let placeholders = vec![("{{name}}".to_string(), name.to_string())];

    send_email(to_email, subject, template_path, &placeholders).await
}

pub async fn send_timesheet_query_email(
    to_email: &str,
    name: &str,
    week_starting: &str,
    query_note: &str,
    job_link: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let subject = "A timesheet has been queried";
    let template_path = "src/mail/templates/Timesheet-query-email.html";
    let placeholders = vec![
        ("{{name}}".to_string(), name.to_string()),
        ("{{week_starting}}".to_string(), week_starting.to_string()),
        ("{{query_note}}".to_string(), query_note.to_string()),
        ("{{job_link}}".to_string(), job_link.to_string()),
    ];

    send_email(to_email, subject, template_path, &placeholders).await
}

pub async fn send_timesheet_response_email(
    to_email: &str,
    name: &str,
    week_starting: &str,
    response_note: &str,
    job_link: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let subject = "The agency has responded to your timesheet query";
    let template_path = "src/mail/templates/Timesheet-response-email.html";
    let placeholders = vec![
        ("{{name}}".to_string(), name.to_string()),
        ("{{week_starting}}".to_string(), week_starting.to_string()),
        ("{{response_note}}".to_string(), response_note.to_string()),
        ("{{job_link}}".to_string(), job_link.to_string()),
    ];

    send_email(to_email, subject, template_path, &placeholders).await
}

pub async fn send_job_cancelled_email(
    to_email: &str,
    name: &str,
    job_link: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let subject = "A care arrangement has been cancelled";
    let template_path = "src/mail/templates/Job-cancelled-email.html";
    let placeholders = vec![
        ("{{name}}".to_string(), name.to_string()),
        ("{{job_link}}".to_string(), job_link.to_string()),
    ];

    send_email(to_email, subject, template_path, &placeholders).await
}
