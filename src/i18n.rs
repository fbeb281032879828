use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Language {
    #[default]
    En,
    Fr,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fr => "fr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKey {
    Name,
    Category,
    Country,
    City,
    Services,
    Transportation,
    Radius,
    DayOfWeek,
    TimeOfDay,
    Languages,
    Payment,
    AboutMe,
    Contact,
    DeliveryRequest,
    SignUpToHelp,
    VolunteersLayer,
    RequestsLayer,
    SourceUnavailable,
}

/// English labels double as the lookup keys; other languages translate them.
pub fn label(key: LabelKey, language: Language) -> &'static str {
    match language {
        Language::En => english(key),
        Language::Fr => french(key),
    }
}

fn english(key: LabelKey) -> &'static str {
    match key {
        LabelKey::Name => "Name",
        LabelKey::Category => "Category",
        LabelKey::Country => "Country",
        LabelKey::City => "City",
        LabelKey::Services => "Services",
        LabelKey::Transportation => "Transportation",
        LabelKey::Radius => "Radius",
        LabelKey::DayOfWeek => "Day of Week",
        LabelKey::TimeOfDay => "Time of Day",
        LabelKey::Languages => "Languages",
        LabelKey::Payment => "Payment",
        LabelKey::AboutMe => "About Me",
        LabelKey::Contact => "Contact",
        LabelKey::DeliveryRequest => "Delivery Request",
        LabelKey::SignUpToHelp => "Sign up to help",
        LabelKey::VolunteersLayer => "Volunteers",
        LabelKey::RequestsLayer => "Requests",
        LabelKey::SourceUnavailable => "Registrations are temporarily unavailable. Please try again later.",
    }
}

fn french(key: LabelKey) -> &'static str {
    match key {
        LabelKey::Name => "Nom",
        LabelKey::Category => "Catégorie",
        LabelKey::Country => "Pays",
        LabelKey::City => "Ville",
        LabelKey::Services => "Services",
        LabelKey::Transportation => "Transport",
        LabelKey::Radius => "Rayon",
        LabelKey::DayOfWeek => "Jour de la semaine",
        LabelKey::TimeOfDay => "Moment de la journée",
        LabelKey::Languages => "Langues",
        LabelKey::Payment => "Paiement",
        LabelKey::AboutMe => "À propos de moi",
        LabelKey::Contact => "Contacter",
        LabelKey::DeliveryRequest => "Demande de livraison",
        LabelKey::SignUpToHelp => "Inscrivez-vous pour aider",
        LabelKey::VolunteersLayer => "Bénévoles",
        LabelKey::RequestsLayer => "Demandes",
        LabelKey::SourceUnavailable => {
            "Les inscriptions sont temporairement indisponibles. Veuillez réessayer plus tard."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_is_identity() {
        assert_eq!(label(LabelKey::DayOfWeek, Language::En), "Day of Week");
        assert_eq!(label(LabelKey::RequestsLayer, Language::default()), "Requests");
    }

    #[test]
    fn french_translates_layer_names() {
        assert_eq!(label(LabelKey::VolunteersLayer, Language::Fr), "Bénévoles");
        assert_eq!(Language::Fr.code(), "fr");
    }
}
