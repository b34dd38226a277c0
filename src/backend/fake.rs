//! Scripted in-memory backend for tests.

use crate::backend::{BackendResult, ContentPart, GenerativeBackend, ImageOptions};
use crate::error::BackendError;
use crate::image::EncodedImage;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What the fake returns for an image prompt containing a given marker.
#[derive(Debug, Clone)]
pub(crate) enum ImageScript {
    Fail(String),
    FailAfter(Duration, String),
    Empty,
    Delay(Duration),
    Panic,
}

/// What the fake returns for an edit call.
#[derive(Debug, Clone)]
pub(crate) enum EditScript {
    Parts(Vec<ContentPart>),
    Fail(String),
    Delay(Duration, Vec<ContentPart>),
}

pub(crate) struct FakeBackend {
    menu_json: Mutex<BackendResult<String>>,
    image_scripts: Mutex<Vec<(String, ImageScript)>>,
    edit_script: Mutex<EditScript>,
    pub(crate) json_calls: AtomicUsize,
    pub(crate) image_calls: AtomicUsize,
    pub(crate) edit_calls: AtomicUsize,
    pub(crate) prompts: Mutex<Vec<String>>,
    pub(crate) options: Mutex<Vec<ImageOptions>>,
}

/// Fake JPEG payload derived from the prompt so each dish gets distinct bytes.
pub(crate) fn fake_jpeg(prompt: &str) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
    data.extend_from_slice(prompt.as_bytes());
    data
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self {
            menu_json: Mutex::new(Ok("[]".to_string())),
            image_scripts: Mutex::new(Vec::new()),
            edit_script: Mutex::new(EditScript::Parts(Vec::new())),
            json_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
            edit_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
        }
    }

    /// Menu parse returns `json` verbatim.
    pub(crate) fn with_menu_json(self, json: impl Into<String>) -> Self {
        *self.menu_json.lock().unwrap() = Ok(json.into());
        self
    }

    /// Menu parse returns the given dishes.
    pub(crate) fn with_dishes(self, dishes: &[(&str, &str)]) -> Self {
        let json: Vec<Value> = dishes
            .iter()
            .map(|(name, description)| serde_json::json!({"name": name, "description": description}))
            .collect();
        self.with_menu_json(Value::Array(json).to_string())
    }

    pub(crate) fn with_menu_error(self, err: BackendError) -> Self {
        *self.menu_json.lock().unwrap() = Err(err);
        self
    }

    /// Image prompts containing `marker` follow `script`.
    pub(crate) fn with_image_script(self, marker: &str, script: ImageScript) -> Self {
        self.image_scripts
            .lock()
            .unwrap()
            .push((marker.to_string(), script));
        self
    }

    pub(crate) fn with_edit_script(self, script: EditScript) -> Self {
        *self.edit_script.lock().unwrap() = script;
        self
    }

    pub(crate) fn set_edit_script(&self, script: EditScript) {
        *self.edit_script.lock().unwrap() = script;
    }

    pub(crate) fn network_calls(&self) -> usize {
        self.json_calls.load(Ordering::SeqCst)
            + self.image_calls.load(Ordering::SeqCst)
            + self.edit_calls.load(Ordering::SeqCst)
    }
}

fn clone_result(result: &BackendResult<String>) -> BackendResult<String> {
    match result {
        Ok(text) => Ok(text.clone()),
        Err(err) => Err(match err {
            BackendError::NotConfigured(m) => BackendError::NotConfigured(m.clone()),
            other => BackendError::UnexpectedResponse(other.to_string()),
        }),
    }
}

#[async_trait]
impl GenerativeBackend for FakeBackend {
    async fn generate_json(&self, _prompt: &str, _schema: &Value) -> BackendResult<String> {
        self.json_calls.fetch_add(1, Ordering::SeqCst);
        clone_result(&self.menu_json.lock().unwrap())
    }

    async fn generate_images(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> BackendResult<Vec<Vec<u8>>> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.options.lock().unwrap().push(*options);

        let script = self
            .image_scripts
            .lock()
            .unwrap()
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map(|(_, script)| script.clone());

        match script {
            Some(ImageScript::Fail(msg)) => Err(BackendError::Api {
                status: 500,
                message: msg,
            }),
            Some(ImageScript::FailAfter(delay, msg)) => {
                tokio::time::sleep(delay).await;
                Err(BackendError::Api {
                    status: 500,
                    message: msg,
                })
            }
            Some(ImageScript::Empty) => Ok(Vec::new()),
            Some(ImageScript::Panic) => panic!("image backend crashed"),
            Some(ImageScript::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(vec![fake_jpeg(prompt)])
            }
            None => Ok(vec![fake_jpeg(prompt)]),
        }
    }

    async fn edit_image(
        &self,
        _image: &EncodedImage,
        _instruction: &str,
    ) -> BackendResult<Vec<ContentPart>> {
        self.edit_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.edit_script.lock().unwrap().clone();
        match script {
            EditScript::Parts(parts) => Ok(parts),
            EditScript::Delay(delay, parts) => {
                tokio::time::sleep(delay).await;
                Ok(parts)
            }
            EditScript::Fail(msg) => Err(BackendError::Api {
                status: 500,
                message: msg,
            }),
        }
    }

    fn name(&self) -> &str {
        "fake"
    }

    async fn health_check(&self) -> BackendResult<()> {
        Ok(())
    }
}

/// Backend that reports a missing credential on every call.
pub(crate) struct UnconfiguredBackend {
    pub(crate) calls: AtomicUsize,
}

impl UnconfiguredBackend {
    pub(crate) fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn fail<T>(&self) -> BackendResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(BackendError::NotConfigured("API key is not configured.".into()))
    }
}

#[async_trait]
impl GenerativeBackend for UnconfiguredBackend {
    async fn generate_json(&self, _prompt: &str, _schema: &Value) -> BackendResult<String> {
        self.fail()
    }

    async fn generate_images(
        &self,
        _prompt: &str,
        _options: &ImageOptions,
    ) -> BackendResult<Vec<Vec<u8>>> {
        self.fail()
    }

    async fn edit_image(
        &self,
        _image: &EncodedImage,
        _instruction: &str,
    ) -> BackendResult<Vec<ContentPart>> {
        self.fail()
    }

    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn health_check(&self) -> BackendResult<()> {
        self.fail()
    }
}
