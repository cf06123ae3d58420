use crate::ContactFormError;
use serde::Deserialize;
use std::fmt::Display;

/// A contact form submission as it arrives in the request body.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContactFormMessage {
    pub name: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub message: Option<String>,
    pub inquiry_type: Option<String>,
    pub phone: Option<String>,
    pub socials: Option<String>,
    pub product_name: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InquiryType<'a> {
    Founder,
    Marketer,
    ProductInquiry,
    Other(&'a str),
}

impl<'a> InquiryType<'a> {
    /// Absent or blank tags count as founder inquiries.
    fn from_tag(tag: Option<&'a str>) -> Self {
        match tag {
            None | Some("founder") => InquiryType::Founder,
            Some("marketer") => InquiryType::Marketer,
            Some("product_inquiry") => InquiryType::ProductInquiry,
            Some(other) => InquiryType::Other(other),
        }
    }
}

impl Display for InquiryType<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InquiryType::Founder => write!(f, "founder"),
            InquiryType::Marketer => write!(f, "marketer"),
            InquiryType::ProductInquiry => write!(f, "product_inquiry"),
            InquiryType::Other(tag) => write!(f, "{tag}"),
        }
    }
}

impl ContactFormMessage {
    pub fn validate(&self) -> Result<ValidatedContactFormMessage<'_>, ContactFormError> {
        let inquiry_type = InquiryType::from_tag(present(&self.inquiry_type));
        let message = present(&self.message);
        let (Some(name), Some(email)) = (present(&self.name), present(&self.email)) else {
            return Err(ContactFormError::ClientError("Missing fields".into()));
        };
        if message.is_none() && inquiry_type != InquiryType::ProductInquiry {
            return Err(ContactFormError::ClientError("Missing fields".into()));
        }
        // The name ends up in the Reply-To and Subject headers, which cannot carry line breaks.
        if name.chars().any(char::is_control) {
            return Err(ContactFormError::ClientError("Invalid name".into()));
        }

        Ok(ValidatedContactFormMessage {
            name,
            email,
            website: present(&self.website),
            message,
            inquiry_type,
            phone: present(&self.phone),
            socials: present(&self.socials),
            product_name: present(&self.product_name),
        })
    }
}

/// Treats empty and whitespace-only fields as absent.
fn present(field: &Option<String>) -> Option<&str> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[derive(Debug)]
pub struct ValidatedContactFormMessage<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub website: Option<&'a str>,
    /// Only absent for product inquiries.
    pub message: Option<&'a str>,
    pub inquiry_type: InquiryType<'a>,
    pub phone: Option<&'a str>,
    pub socials: Option<&'a str>,
    pub product_name: Option<&'a str>,
}
