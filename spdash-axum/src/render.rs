//! HTML fragments for the callback page.

use spdash_core::{AuthError, Contact, ProfileInfo};
use std::fmt::Write;

/// Escapes text for use in HTML content and double-quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn field(value: &Option<String>) -> String {
    escape(value.as_deref().unwrap_or_default())
}

/// Department and role blocks; either is omitted when the profile lacks it.
pub fn render_profile(profile: &ProfileInfo) -> String {
    let mut html = String::new();

    if let Some((name, id)) = profile.department() {
        let _ = write!(
            html,
            "Deze gebruiker is lid van de afdeling {} ({}).<br /><br />",
            escape(name),
            escape(id)
        );
    }

    if !profile.roles.is_empty() {
        html.push_str("Deze gebruiker heeft de volgende rollen:<br />");
        for role in &profile.roles {
            let _ = write!(html, "- {} ({})<br />", field(&role.name), field(&role.id));
        }
    }

    html
}

/// One line per contact, fields in a fixed order.
pub fn render_contact(contact: &Contact) -> String {
    format!(
        "- {} {} ({}, {} {}; {}; {}; {},{})<br />",
        field(&contact.contact_id),
        field(&contact.display_name),
        field(&contact.street_address),
        field(&contact.postal_code),
        field(&contact.city),
        field(&contact.phone),
        field(&contact.email),
        field(&contact.geo_code_1),
        field(&contact.geo_code_2),
    )
}

/// The contact lines, or the upstream error line when the CRM call failed.
pub fn render_contacts(contacts: Result<Vec<Contact>, AuthError>) -> String {
    match contacts {
        Ok(contacts) => contacts.iter().map(render_contact).collect(),
        Err(AuthError::UpstreamApi { code, message }) => {
            tracing::warn!(code, %message, "crm api call failed");
            format!(
                "API-error: HTTP {} - Civi msg: {}<br /><br />",
                code,
                escape(&message)
            )
        }
        Err(other) => format!("{}<br /><br />", escape(&other.to_string())),
    }
}

/// The full callback page.
pub fn render_dashboard(
    profile: Option<&ProfileInfo>,
    contacts: Result<Vec<Contact>, AuthError>,
    contact_limit: u32,
    again_href: &str,
) -> String {
    let mut html = String::from("Succesvolle OAuth-authenticatie.<br />");

    if let Some(profile) = profile {
        html.push_str(&render_profile(profile));
    }

    let _ = write!(
        html,
        "<br />Met onze access token kunnen we nu ook wat CiviCRM API calls doen.<br />\
         Dit zijn de eerste {contact_limit} contacten waartoe we toegang hebben:<br />"
    );
    html.push_str(&render_contacts(contacts));

    let _ = write!(
        html,
        "<br /><br /><a href=\"{}\">Nog een keer</a>",
        escape(again_href)
    );
    html
}
