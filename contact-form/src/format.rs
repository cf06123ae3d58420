use crate::message::{InquiryType, ValidatedContactFormMessage};
use serde::Serialize;
use serde_json::Value;
use tinytemplate::{error::Error, format, TinyTemplate};

const CONTACT_TEMPLATE_NAME: &str = "contact-message";
const CONTACT_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/contact-message.html"
));

const NOT_PROVIDED: &str = "Not provided";
const NOT_APPLICABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq)]
pub struct FormattedMessage {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[derive(Serialize)]
struct ContactContext<'a> {
    subject: &'a str,
    name: &'a str,
    email: &'a str,
    inquiry_type: String,
    website: &'a str,
    phone: &'a str,
    socials: &'a str,
    product_name: &'a str,
    message: &'a str,
}

pub fn format_message(message: &ValidatedContactFormMessage) -> Result<FormattedMessage, Error> {
    let subject = subject_line(message);
    let context = ContactContext {
        subject: &subject,
        name: message.name,
        email: message.email,
        inquiry_type: message.inquiry_type.to_string(),
        website: message.website.unwrap_or(NOT_PROVIDED),
        phone: message.phone.unwrap_or(NOT_PROVIDED),
        socials: message.socials.unwrap_or(NOT_PROVIDED),
        product_name: message.product_name.unwrap_or(NOT_APPLICABLE),
        message: message.message.unwrap_or(NOT_APPLICABLE),
    };
    let text_body = format!(
        "Name: {}\nEmail: {}\nInquiry type: {}\nWebsite: {}\nPhone: {}\nSocials: {}\nProduct: {}\n\nMessage:\n{}\n",
        context.name,
        context.email,
        context.inquiry_type,
        context.website,
        context.phone,
        context.socials,
        context.product_name,
        context.message,
    );
    let html_body = render_template(CONTACT_TEMPLATE_NAME, CONTACT_TEMPLATE, &context)?;
    Ok(FormattedMessage {
        subject,
        text_body,
        html_body,
    })
}

fn subject_line(message: &ValidatedContactFormMessage) -> String {
    let name = message.name;
    match message.inquiry_type {
        InquiryType::Founder => format!("[FOUNDER INQUIRY] from {name}"),
        InquiryType::Marketer => format!("[HUNTER APPLICATION] from {name}"),
        InquiryType::ProductInquiry => match message.product_name {
            Some(product) => format!("[PRODUCT INQUIRY] {product} from {name}"),
            None => format!("[PRODUCT INQUIRY] from {name}"),
        },
        InquiryType::Other(_) => format!("[WEBSITE INQUIRY] from {name}"),
    }
}

/// Renders one of the bundled HTML templates. All values are HTML-escaped unless the template
/// asks for `unescaped` explicitly.
pub(crate) fn render_template<C: Serialize>(
    name: &'static str,
    template: &'static str,
    context: &C,
) -> Result<String, Error> {
    let mut tt = TinyTemplate::new();
    tt.add_formatter("render_paragraphs", render_paragraphs);
    tt.add_template(name, template)?;
    tt.render(name, context)
}

fn render_paragraphs(value: &Value, output: &mut String) -> Result<(), Error> {
    output.push_str("<p>");
    let mut formatted = String::new();
    format(value, &mut formatted)?;
    output.push_str(&formatted.replace("\r\n", "\n").replace("\n\n", "</p><p>"));
    output.push_str("</p>");
    Ok(())
}
