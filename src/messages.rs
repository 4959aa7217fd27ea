use crate::{error::StoreError, models::Appointment, store::EntityStore};

// Brazilian country code, prepended when dialing out.
pub const COUNTRY_CODE: &str = "55";

const DEFAULT_CONFIRMATION: &str = "Olá {nome}! ✂️

Seu agendamento foi confirmado:
📅 Data: {data}
⏰ Horário: {hora}
💈 Serviço: {servico}
💰 Valor: R$ {valor}

Nos vemos em breve! 😊";

const DEFAULT_REMINDER: &str = "Olá {nome}! 🔔

Lembrete: Amanhã você tem agendamento às {hora}!
💈 {servico}

Qualquer imprevisto, avise com antecedência! 😊";

const DEFAULT_CANCELLATION: &str = "Olá {nome},

Seu agendamento foi cancelado:
📅 {data} às {hora}
💈 {servico}

Para reagendar, entre em contato! 📞";

const DEFAULT_THANKS: &str = "Olá {nome}! 😊

Obrigado por escolher nossos serviços!
Esperamos que tenha gostado do seu {servico}! ✨

Até a próxima! 💈";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Confirmation,
    Reminder,
    Cancellation,
    Thanks,
}

impl MessageKind {
    pub const ALL: [MessageKind; 4] = [
        MessageKind::Confirmation,
        MessageKind::Reminder,
        MessageKind::Cancellation,
        MessageKind::Thanks,
    ];

    pub fn setting_key(self) -> &'static str {
        match self {
            MessageKind::Confirmation => "msg_confirmacao",
            MessageKind::Reminder => "msg_lembrete",
            MessageKind::Cancellation => "msg_cancelamento",
            MessageKind::Thanks => "msg_agradecimento",
        }
    }

    pub fn default_template(self) -> &'static str {
        match self {
            MessageKind::Confirmation => DEFAULT_CONFIRMATION,
            MessageKind::Reminder => DEFAULT_REMINDER,
            MessageKind::Cancellation => DEFAULT_CANCELLATION,
            MessageKind::Thanks => DEFAULT_THANKS,
        }
    }
}

// Pure substitution pass over the fixed token set. Tokens always resolve
// to a value ({valor} falls back to 0.00), so no raw placeholder survives
// rendering.
pub fn render(template: &str, appointment: &Appointment) -> String {
    let data = appointment.scheduled_for.format("%d/%m/%Y").to_string();
    let hora = appointment.scheduled_for.format("%H:%M").to_string();
    let valor = format!("{:.2}", appointment.value_paid.unwrap_or(0.0));

    template
        .replace("{nome}", &appointment.client_name)
        .replace("{data}", &data)
        .replace("{hora}", &hora)
        .replace("{servico}", appointment.service.label())
        .replace("{valor}", &valor)
}

pub async fn template_override(
    store: &EntityStore,
    kind: MessageKind,
) -> Result<Option<String>, StoreError> {
    store.get_setting(kind.setting_key()).await
}

pub async fn set_template_override(
    store: &EntityStore,
    kind: MessageKind,
    template: &str,
) -> Result<(), StoreError> {
    store.put_setting(kind.setting_key(), template).await
}

pub async fn clear_template_override(
    store: &EntityStore,
    kind: MessageKind,
) -> Result<(), StoreError> {
    store.remove_setting(kind.setting_key()).await
}

pub async fn effective_template(
    store: &EntityStore,
    kind: MessageKind,
) -> Result<String, StoreError> {
    let override_template = template_override(store, kind).await?;
    Ok(override_template.unwrap_or_else(|| kind.default_template().to_string()))
}

// Loading the override is the only I/O on the rendering path.
pub async fn render_message(
    store: &EntityStore,
    kind: MessageKind,
    appointment: &Appointment,
) -> Result<String, StoreError> {
    let template = effective_template(store, kind).await?;
    Ok(render(&template, appointment))
}

// Strips formatting down to digits and prepends the country code when the
// number does not carry it yet. Used only to address outbound messages,
// never written back to the client record.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.starts_with(COUNTRY_CODE) {
        digits
    } else {
        format!("{COUNTRY_CODE}{digits}")
    }
}

// wa.me link with the rendered message pre-filled; opening it is up to the
// caller, and a missing messaging app is reported there, not retried.
pub fn delivery_url(phone: &str, message: &str) -> String {
    format!(
        "https://wa.me/{}?text={}",
        normalize_phone(phone),
        urlencoding::encode(message)
    )
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::{new_id, ServiceKind, Status};

    fn appointment(value_paid: Option<f64>) -> Appointment {
        Appointment {
            id: new_id(),
            client_id: new_id(),
            client_name: "Ana".to_string(),
            client_phone: "(11) 99999-8888".to_string(),
            scheduled_for: Utc.with_ymd_and_hms(2026, 3, 14, 15, 30, 0).unwrap(),
            service: ServiceKind::CorteEBarba,
            status: Status::Scheduled,
            value_paid,
            notification_sent: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn substitutes_every_token() {
        let rendered = render(
            "{nome} - {data} - {hora} - {servico} - {valor}",
            &appointment(Some(35.0)),
        );
        assert_eq!(rendered, "Ana - 14/03/2026 - 15:30 - Corte e Barba - 35.00");
    }

    #[test]
    fn missing_value_renders_as_zero() {
        let rendered = render("R$ {valor}", &appointment(None));
        assert_eq!(rendered, "R$ 0.00");
    }

    #[test]
    fn repeated_tokens_are_all_replaced() {
        let rendered = render("{nome} {nome} {nome}", &appointment(None));
        assert_eq!(rendered, "Ana Ana Ana");
    }

    #[test]
    fn default_confirmation_has_no_leftover_placeholders() {
        let rendered = render(
            MessageKind::Confirmation.default_template(),
            &appointment(None),
        );
        assert!(rendered.contains("Ana"));
        assert!(rendered.contains("R$ 0.00"));
        assert!(!rendered.contains('{'));
    }

    #[test]
    fn normalizes_phone_to_international_digits() {
        assert_eq!(normalize_phone("(11) 99999-8888"), "5511999998888");
        assert_eq!(normalize_phone("5511999998888"), "5511999998888");
    }

    #[test]
    fn delivery_url_encodes_message_text() {
        let url = delivery_url("(11) 99999-8888", "Olá Ana!");
        assert_eq!(url, "https://wa.me/5511999998888?text=Ol%C3%A1%20Ana%21");
    }

    #[tokio::test]
    async fn override_wins_and_clearing_restores_default() {
        let store = EntityStore::in_memory().await.unwrap();
        let appointment = appointment(None);

        let rendered = render_message(&store, MessageKind::Thanks, &appointment)
            .await
            .unwrap();
        assert!(rendered.starts_with("Olá Ana!"));

        set_template_override(&store, MessageKind::Thanks, "Valeu, {nome}!")
            .await
            .unwrap();
        let rendered = render_message(&store, MessageKind::Thanks, &appointment)
            .await
            .unwrap();
        assert_eq!(rendered, "Valeu, Ana!");

        clear_template_override(&store, MessageKind::Thanks).await.unwrap();
        let rendered = render_message(&store, MessageKind::Thanks, &appointment)
            .await
            .unwrap();
        assert!(rendered.starts_with("Olá Ana!"));
    }
}
