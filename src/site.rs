//! Static site content: service catalog, contact number and the consultant's
//! fixed strings.

/// One selectable service in the lead form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Service {
    pub id: &'static str,
    pub label: &'static str,
}

/// Selectable services, in display order. The first entry is the default.
pub const SERVICES: &[Service] = &[
    Service { id: "carotaj", label: "Carotaj Beton" },
    Service { id: "taiere", label: "Tăiere Beton" },
    Service { id: "demolare", label: "Demolare Controlată" },
    Service { id: "consultanta", label: "Consultanță Tehnică" },
];

pub const COMPANY_NAME: &str = "Carotaj Pro";
pub const PHONE_NUMBER: &str = "+40 722 000 000";

/// First message of every chat transcript.
pub const CHAT_GREETING: &str = "Salut. Te pot ajuta cu o estimare rapidă pentru carotaj?";

/// Reply used when the provider answers without any text.
pub const CHAT_APOLOGY: &str =
    "Îmi pare rău, nu am putut genera un răspuns momentan. Vă rugăm să ne contactați telefonic.";

/// Reply used for failed generations when the failure notice is enabled.
pub const CHAT_FAILURE_NOTICE: &str =
    "A apărut o eroare tehnică. Vă rugăm să folosiți formularul de contact sau să ne sunați.";

/// Persona and house rules sent with every consultant request.
pub const SYSTEM_INSTRUCTION: &str = include_str!("../prompts/consultant.txt");

/// The service preselected in a fresh form.
#[must_use]
pub fn default_service() -> &'static Service {
    &SERVICES[0]
}

/// Look up a service by its identifier.
#[must_use]
pub fn find_service(id: &str) -> Option<&'static Service> {
    SERVICES.iter().find(|s| s.id == id)
}

#[cfg(test)]
#[path = "site_test.rs"]
mod tests;
