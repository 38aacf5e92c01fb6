use serde::{Deserialize, Serialize};

use super::user::EntityId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub provider_id: Option<EntityId>,
}

/// The slice of a service the backend embeds inside bookings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<EntityId>,
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Create/edit payload for a service. Sent as multipart so the image can
/// travel with the text fields.
#[derive(Debug, Clone)]
pub struct ServiceForm {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub image: Option<ImageUpload>,
}

impl ServiceForm {
    pub fn into_multipart(self) -> Result<reqwest::multipart::Form, reqwest::Error> {
        let mut form = reqwest::multipart::Form::new()
            .text("name", self.name)
            .text("description", self.description)
            .text("price", self.price.to_string())
            .text("category", self.category);

        if let Some(image) = self.image {
            let part = reqwest::multipart::Part::bytes(image.bytes)
                .file_name(image.file_name)
                .mime_str(&image.mime_type)?;
            form = form.part("image", part);
        }

        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_from_camel_case() {
        let json = r#"{"id":3,"name":"Deep Cleaning","description":"2BHK","price":1499.5,"category":"Cleaning","imageUrl":"/uploads/a.png","providerId":9}"#;
        let service: Service = serde_json::from_str(json).unwrap();
        assert_eq!(service.image_url.as_deref(), Some("/uploads/a.png"));
        assert_eq!(service.provider_id, Some(9));
        assert_eq!(service.price, 1499.5);
    }

    #[test]
    fn test_multipart_rejects_bad_mime() {
        let form = ServiceForm {
            name: "Plumbing".to_string(),
            description: String::new(),
            price: 300.0,
            category: "Repair".to_string(),
            image: Some(ImageUpload {
                file_name: "x.png".to_string(),
                mime_type: "not a mime".to_string(),
                bytes: vec![1, 2, 3],
            }),
        };
        assert!(form.into_multipart().is_err());
    }
}
