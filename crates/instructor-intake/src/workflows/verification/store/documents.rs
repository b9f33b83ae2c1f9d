use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{debug, info};

use super::{StoreError, VerificationStore};
use crate::workflows::verification::domain::{
    DocumentSlot, DocumentUpload, EntryId, ReviewStatus, SlotKind,
};
use crate::workflows::verification::gateway::{
    ContentCategory, FileUpload, Session, UploadMetadata, UploadedFile,
};
use crate::workflows::verification::steps::StepId;
use crate::workflows::verification::ui::NotificationKind;

const UPLOAD_FAILED: &str = "Upload failed";

impl VerificationStore {
    /// Send a file to the upload service and record its metadata in `slot`.
    /// Singular slots are replaced, list slots grow.
    pub async fn upload_document(
        &self,
        slot: DocumentSlot,
        file: FileUpload,
        session: &Session,
    ) -> Result<DocumentUpload, StoreError> {
        let field = slot.field_name();
        let Some((user_id, token)) = session.credentials() else {
            return Err(self.fail(field, UPLOAD_FAILED, StoreError::Unauthenticated));
        };

        let verification_id = {
            let state = self.inner.state();
            if state.is_locked() {
                let status = state.status;
                drop(state);
                return Err(self.fail(field, UPLOAD_FAILED, StoreError::Locked(status)));
            }
            state.verification_id.clone()
        };

        let category = ContentCategory::from_mime(&file.mime_type);
        let metadata = UploadMetadata {
            slot,
            user_id: user_id.to_string(),
            verification_id,
        };
        info!(slot = field, size = file.size(), ?category, "uploading document");

        let uploaded = match self
            .inner
            .uploads
            .upload_file(&file, category, &metadata, token)
            .await
        {
            Ok(uploaded) => uploaded,
            Err(err) => return Err(self.fail(field, UPLOAD_FAILED, err.into())),
        };

        let upload = self.describe_upload(&file, category, uploaded);

        self.edit_scoped(StepId::Documents, field, UPLOAD_FAILED, |state, _| {
            let documents = &mut state.document.documents;
            match slot.kind() {
                SlotKind::List => {
                    if let Some(list) = documents.list_mut(slot) {
                        list.push(upload.clone());
                    }
                }
                SlotKind::Single => {
                    if let Some(single) = documents.single_mut(slot) {
                        *single = Some(upload.clone());
                    }
                }
            }
            state.ui.clear_field_errors(field);
            Ok(())
        })?;

        {
            let mut state = self.inner.state();
            self.inner.notify(
                &mut state,
                NotificationKind::Success,
                "Upload complete",
                &format!("{} was uploaded", upload.name),
            );
            self.inner.persist_locally(&mut state);
        }

        Ok(upload)
    }

    fn describe_upload(
        &self,
        file: &FileUpload,
        category: ContentCategory,
        uploaded: UploadedFile,
    ) -> DocumentUpload {
        let is_image = category == ContentCategory::Image;
        let data_url = (is_image && file.size() < self.inner.config.inline_preview_limit_bytes)
            .then(|| format!("data:{};base64,{}", file.mime_type, STANDARD.encode(&file.bytes)));

        let id = if uploaded.id.trim().is_empty() {
            self.inner.ids.next_id()
        } else {
            EntryId(uploaded.id)
        };
        let mime_type = if file.mime_type.trim().is_empty() {
            uploaded.content_type
        } else {
            file.mime_type.clone()
        };
        let name = if uploaded.name.trim().is_empty() {
            file.name.clone()
        } else {
            uploaded.name
        };

        DocumentUpload {
            id,
            name,
            size: uploaded.size,
            mime_type,
            preview_url: is_image.then(|| uploaded.url.clone()),
            url: uploaded.url,
            data_url,
            upload_date: uploaded.uploaded_at,
            verification_status: ReviewStatus::Pending,
        }
    }

    /// Clear a singular slot, or drop one upload from a list slot. Without an id a
    /// list slot is emptied.
    pub fn remove_document(
        &self,
        slot: DocumentSlot,
        id: Option<&EntryId>,
    ) -> Result<(), StoreError> {
        self.edit(StepId::Documents, |state, _| {
            let documents = &mut state.document.documents;
            match slot.kind() {
                SlotKind::List => {
                    let Some(list) = documents.list_mut(slot) else {
                        return Ok(());
                    };
                    match id {
                        Some(id) => {
                            let position = list
                                .iter()
                                .position(|upload| &upload.id == id)
                                .ok_or_else(|| StoreError::NotFound {
                                    collection: slot.field_name(),
                                    id: id.clone(),
                                })?;
                            list.remove(position);
                        }
                        None => list.clear(),
                    }
                }
                SlotKind::Single => {
                    if let Some(single) = documents.single_mut(slot) {
                        *single = None;
                    }
                }
            }
            debug!(slot = slot.field_name(), "document removed");
            Ok(())
        })
    }
}
