// src/services/notification_service.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;

use crate::models::order::{DeliveryMethod, PaymentMethod};

// Resumen del pedido para los correos de confirmación.
#[derive(Debug, Clone)]
pub struct OrderEmailItem {
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrderEmailData {
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub items: Vec<OrderEmailItem>,
    pub subtotal: Decimal,
    pub delivery_cost: Decimal,
    pub total: Decimal,
    pub delivery_method: DeliveryMethod,
    pub delivery_date: NaiveDate,
    pub delivery_address: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

/// Envía las confirmaciones de pedido por la API REST de Resend.
///
/// Todo el servicio es "mejor esfuerzo": un fallo acá se registra y se
/// descarta. El pedido ya está confirmado en la base cuando se invoca.
#[derive(Clone)]
pub struct NotificationService {
    client: reqwest::Client,
    api_key: Option<String>,
    from_email: String,
    admin_email: String,
}

const RESEND_URL: &str = "https://api.resend.com/emails";

impl NotificationService {
    pub fn new(api_key: Option<String>, from_email: String, admin_email: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from_email,
            admin_email,
        }
    }

    /// Despacha los correos en una tarea aparte y devuelve el control de
    /// inmediato: la respuesta al cliente no espera al proveedor de correo.
    pub fn dispatch(&self, data: OrderEmailData) {
        let sender = self.clone();
        tokio::spawn(async move {
            sender.send_order_emails(data).await;
        });
    }

    async fn send_order_emails(&self, data: OrderEmailData) {
        let Some(api_key) = self.api_key.clone() else {
            tracing::warn!(
                "RESEND_API_KEY no configurada; se omiten los correos del pedido {}",
                data.order_number
            );
            return;
        };

        let html = build_confirmation_html(&data);
        let text = build_confirmation_text(&data);

        let customer_subject = format!("Pedido confirmado #{} — La Tabla", data.order_number);
        let admin_subject = format!("Nuevo pedido #{} — ₡{}", data.order_number, data.total);

        // Los dos envíos corren en paralelo y cada resultado se registra
        // por separado: que falle uno no frena al otro.
        let (customer, admin) = tokio::join!(
            self.send_email(&api_key, &data.customer_email, &customer_subject, &html, &text),
            self.send_email(&api_key, &self.admin_email, &admin_subject, &html, &text),
        );

        match customer {
            Ok(()) => tracing::info!("Correo al cliente enviado ({})", data.order_number),
            Err(e) => tracing::error!("Falló el correo al cliente ({}): {e:?}", data.order_number),
        }
        match admin {
            Ok(()) => tracing::info!("Correo a administración enviado ({})", data.order_number),
            Err(e) => tracing::error!(
                "Falló el correo a administración ({}): {e:?}",
                data.order_number
            ),
        }
    }

    async fn send_email(
        &self,
        api_key: &str,
        to: &str,
        subject: &str,
        html: &str,
        text: &str,
    ) -> anyhow::Result<()> {
        let response = self
            .client
            .post(RESEND_URL)
            .bearer_auth(api_key)
            .json(&json!({
                "from": self.from_email,
                "to": [to],
                "subject": subject,
                "html": html,
                "text": text,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Resend respondió {}", response.status());
        }
        Ok(())
    }
}

fn delivery_label(method: DeliveryMethod) -> &'static str {
    match method {
        DeliveryMethod::Delivery => "Entrega a domicilio",
        DeliveryMethod::Pickup => "Retiro en local",
    }
}

fn payment_label(method: Option<PaymentMethod>) -> &'static str {
    match method {
        Some(PaymentMethod::Sinpe) => "SINPE Móvil",
        Some(PaymentMethod::Transfer) => "Transferencia bancaria",
        None => "Por definir",
    }
}

pub fn build_confirmation_text(data: &OrderEmailData) -> String {
    let mut body = String::new();
    body.push_str(&format!("Pedido #{}\n", data.order_number));
    body.push_str(&format!("Hola {},\n\n", data.customer_name));
    body.push_str("Recibimos tu pedido:\n\n");

    for item in &data.items {
        body.push_str(&format!(
            "  {} x{} — ₡{}\n",
            item.name, item.quantity, item.total_price
        ));
        if let Some(notes) = &item.notes {
            body.push_str(&format!("    Nota: {notes}\n"));
        }
    }

    body.push_str(&format!("\nSubtotal: ₡{}\n", data.subtotal));
    body.push_str(&format!("Envío: ₡{}\n", data.delivery_cost));
    body.push_str(&format!("Total: ₡{}\n\n", data.total));
    body.push_str(&format!("{}: {}\n", delivery_label(data.delivery_method), data.delivery_date));
    if let Some(address) = &data.delivery_address {
        body.push_str(&format!("Dirección: {address}\n"));
    }
    body.push_str(&format!("Pago: {}\n", payment_label(data.payment_method)));
    if let Some(notes) = &data.notes {
        body.push_str(&format!("Notas: {notes}\n"));
    }
    body.push_str("\nGracias por tu compra.\nLa Tabla\n");
    body
}

pub fn build_confirmation_html(data: &OrderEmailData) -> String {
    let rows: String = data
        .items
        .iter()
        .map(|item| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>₡{}</td></tr>",
                item.name, item.quantity, item.total_price
            )
        })
        .collect();

    format!(
        r#"<h2>Pedido #{number}</h2>
<p>Hola {name}, recibimos tu pedido.</p>
<table>
<tr><th>Producto</th><th>Cantidad</th><th>Total</th></tr>
{rows}
</table>
<p>Subtotal: ₡{subtotal}<br/>Envío: ₡{delivery_cost}<br/><strong>Total: ₡{total}</strong></p>
<p>{delivery}: {date}</p>
<p>Pago: {payment}</p>
<p>Gracias por tu compra.<br/>La Tabla</p>"#,
        number = data.order_number,
        name = data.customer_name,
        rows = rows,
        subtotal = data.subtotal,
        delivery_cost = data.delivery_cost,
        total = data.total,
        delivery = delivery_label(data.delivery_method),
        date = data.delivery_date,
        payment = payment_label(data.payment_method),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> OrderEmailData {
        OrderEmailData {
            order_number: "LT-250818-A1B2C3D4".to_string(),
            customer_name: "Ana".to_string(),
            customer_email: "ana@example.com".to_string(),
            items: vec![OrderEmailItem {
                name: "Tabla Clásica".to_string(),
                quantity: 2,
                unit_price: Decimal::new(2500000, 2),
                total_price: Decimal::new(5000000, 2),
                notes: Some("Sin maní".to_string()),
            }],
            subtotal: Decimal::new(5000000, 2),
            delivery_cost: Decimal::ZERO,
            total: Decimal::new(5000000, 2),
            delivery_method: DeliveryMethod::Delivery,
            delivery_date: NaiveDate::from_ymd_opt(2025, 9, 15).unwrap(),
            delivery_address: Some("San José".to_string()),
            payment_method: Some(PaymentMethod::Sinpe),
            notes: None,
        }
    }

    #[test]
    fn text_body_includes_number_items_and_total() {
        let body = build_confirmation_text(&sample_data());
        assert!(body.contains("LT-250818-A1B2C3D4"));
        assert!(body.contains("Tabla Clásica x2"));
        assert!(body.contains("Sin maní"));
        assert!(body.contains("Total: ₡50000.00"));
    }

    #[test]
    fn html_body_includes_number_and_total() {
        let html = build_confirmation_html(&sample_data());
        assert!(html.contains("LT-250818-A1B2C3D4"));
        assert!(html.contains("Tabla Clásica"));
        assert!(html.contains("50000.00"));
    }
}
