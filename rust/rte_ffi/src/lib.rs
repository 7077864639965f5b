//! C ABI over the editor session for native hosts.
//!
//! Strings cross the boundary as NUL-terminated UTF-8. Strings returned by
//! this library are owned by the caller and must be released with
//! [`rte_string_free`].

use std::cell::RefCell;
use std::ffi::{c_char, CStr, CString};
use std::ptr;
use std::rc::Rc;

use rte_core::{
    Command, EditorConfig, EditorCore, EditorError, EditorHost, ImageInsertion, ImageSource, Selection, UploadError,
};
use tracing::warn;

#[derive(Default)]
struct Outbox {
    change: Option<String>,
    error: Option<String>,
}

struct NativeHost {
    outbox: Rc<RefCell<Outbox>>,
    uploads: bool,
}

impl EditorHost for NativeHost {
    fn on_change(&mut self, html: &str) {
        self.outbox.borrow_mut().change = Some(html.to_string());
    }

    fn on_error(&mut self, error: &EditorError) {
        self.outbox.borrow_mut().error = Some(error.to_string());
    }

    fn uploads_images(&self) -> bool {
        self.uploads
    }
}

pub struct RteEditor {
    core: EditorCore,
    outbox: Rc<RefCell<Outbox>>,
}

impl RteEditor {
    fn new(config: EditorConfig, html: &str, uploads: bool) -> Self {
        let outbox = Rc::new(RefCell::new(Outbox::default()));
        let mut core = EditorCore::new(config, html);
        core.set_host(Box::new(NativeHost { outbox: outbox.clone(), uploads }));
        RteEditor { core, outbox }
    }
}

unsafe fn read_str<'a>(raw: *const c_char) -> Option<&'a str> {
    if raw.is_null() {
        return None;
    }
    CStr::from_ptr(raw).to_str().ok()
}

fn into_raw(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(s) => s.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

unsafe fn live<'a>(raw: *mut RteEditor) -> Option<&'a mut RteEditor> {
    raw.as_mut()
}

/// Creates a session. `html` and `config_json` may be null. With
/// `uploads_images` set, binary images are handed back to the caller for
/// upload instead of being embedded.
///
/// # Safety
/// Non-null arguments must be valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn rte_editor_new(
    html: *const c_char,
    config_json: *const c_char,
    uploads_images: bool,
) -> *mut RteEditor {
    let config = match read_str(config_json).map(EditorConfig::from_json) {
        Some(Ok(config)) => config,
        Some(Err(err)) => {
            warn!(error = %err, "invalid editor config, using defaults");
            EditorConfig::default()
        }
        None => EditorConfig::default(),
    };
    let html = read_str(html).unwrap_or("");
    Box::into_raw(Box::new(RteEditor::new(config, html, uploads_images)))
}

/// # Safety
/// `editor` must come from [`rte_editor_new`] and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn rte_editor_free(editor: *mut RteEditor) {
    if !editor.is_null() {
        drop(Box::from_raw(editor));
    }
}

/// # Safety
/// `s` must come from this library.
#[no_mangle]
pub unsafe extern "C" fn rte_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Applies a JSON-encoded command. Returns whether the document or
/// selection changed.
///
/// # Safety
/// `editor` must be live and `json` a valid string.
#[no_mangle]
pub unsafe extern "C" fn rte_editor_apply(editor: *mut RteEditor, json: *const c_char) -> bool {
    let (Some(editor), Some(json)) = (live(editor), read_str(json)) else { return false };
    match Command::from_json(json) {
        Ok(command) => editor.core.apply(&command),
        Err(err) => {
            warn!(error = %err, "unparseable command");
            false
        }
    }
}

/// # Safety
/// `editor` must be live and `json` a valid string.
#[no_mangle]
pub unsafe extern "C" fn rte_editor_set_selection(editor: *mut RteEditor, json: *const c_char) -> bool {
    let (Some(editor), Some(json)) = (live(editor), read_str(json)) else { return false };
    match serde_json::from_str::<Selection>(json) {
        Ok(selection) => editor.core.set_selection(selection),
        Err(err) => {
            warn!(error = %err, "unparseable selection");
            false
        }
    }
}

/// # Safety
/// `editor` must be live and `text` a valid string.
#[no_mangle]
pub unsafe extern "C" fn rte_editor_insert_text(editor: *mut RteEditor, text: *const c_char) -> bool {
    let (Some(editor), Some(text)) = (live(editor), read_str(text)) else { return false };
    editor.core.insert_text(text)
}

/// # Safety
/// `editor` must be live.
#[no_mangle]
pub unsafe extern "C" fn rte_editor_delete_backward(editor: *mut RteEditor) -> bool {
    live(editor).is_some_and(|e| e.core.delete_backward())
}

/// Ends the current typing batch.
///
/// # Safety
/// `editor` must be live.
#[no_mangle]
pub unsafe extern "C" fn rte_editor_commit(editor: *mut RteEditor) {
    if let Some(editor) = live(editor) {
        editor.core.commit();
    }
}

/// # Safety
/// `editor` must be live and `html` a valid string.
#[no_mangle]
pub unsafe extern "C" fn rte_editor_load_html(editor: *mut RteEditor, html: *const c_char) -> bool {
    let (Some(editor), Some(html)) = (live(editor), read_str(html)) else { return false };
    match editor.core.load_html(html) {
        Ok(()) => true,
        Err(err) => {
            editor.outbox.borrow_mut().error = Some(err.to_string());
            false
        }
    }
}

/// # Safety
/// `editor` must be live.
#[no_mangle]
pub unsafe extern "C" fn rte_editor_html(editor: *mut RteEditor) -> *mut c_char {
    live(editor).map_or(ptr::null_mut(), |e| into_raw(e.core.to_html()))
}

/// # Safety
/// `editor` must be live.
#[no_mangle]
pub unsafe extern "C" fn rte_editor_json(editor: *mut RteEditor) -> *mut c_char {
    live(editor).map_or(ptr::null_mut(), |e| into_raw(e.core.to_json()))
}

/// Latest serialized document since the previous call, or null.
///
/// # Safety
/// `editor` must be live.
#[no_mangle]
pub unsafe extern "C" fn rte_editor_take_change(editor: *mut RteEditor) -> *mut c_char {
    let Some(editor) = live(editor) else { return ptr::null_mut() };
    let change = editor.outbox.borrow_mut().change.take();
    change.map_or(ptr::null_mut(), into_raw)
}

/// Latest user-visible error message, or null.
///
/// # Safety
/// `editor` must be live.
#[no_mangle]
pub unsafe extern "C" fn rte_editor_take_error(editor: *mut RteEditor) -> *mut c_char {
    let Some(editor) = live(editor) else { return ptr::null_mut() };
    let error = editor.outbox.borrow_mut().error.take();
    error.map_or(ptr::null_mut(), into_raw)
}

/// # Safety
/// `editor` must be live and `src` a valid string.
#[no_mangle]
pub unsafe extern "C" fn rte_editor_insert_image_url(editor: *mut RteEditor, src: *const c_char) -> bool {
    let (Some(editor), Some(src)) = (live(editor), read_str(src)) else { return false };
    editor.core.insert_image(ImageSource::Url(src.to_string())) == ImageInsertion::Inserted
}

/// Inserts an image from `len` bytes at `data`. Returns the upload ticket
/// when the caller must upload the bytes and report back through
/// [`rte_editor_complete_upload`], or 0 when the image was embedded or
/// declined.
///
/// # Safety
/// `editor` must be live, `data` must point to `len` readable bytes and
/// `mime` must be a valid string.
#[no_mangle]
pub unsafe extern "C" fn rte_editor_insert_image_bytes(
    editor: *mut RteEditor,
    data: *const u8,
    len: usize,
    mime: *const c_char,
) -> u64 {
    let (Some(editor), Some(mime)) = (live(editor), read_str(mime)) else { return 0 };
    if data.is_null() {
        return 0;
    }
    let data = std::slice::from_raw_parts(data, len).to_vec();
    match editor.core.insert_image(ImageSource::Bytes { data, mime: mime.to_string() }) {
        ImageInsertion::Pending(request) => request.ticket,
        ImageInsertion::Inserted | ImageInsertion::Declined => 0,
    }
}

/// Reports the outcome of an upload. A null `url` means the upload failed
/// with `message`.
///
/// # Safety
/// `editor` must be live; non-null strings must be valid.
#[no_mangle]
pub unsafe extern "C" fn rte_editor_complete_upload(
    editor: *mut RteEditor,
    ticket: u64,
    url: *const c_char,
    message: *const c_char,
) -> bool {
    let Some(editor) = live(editor) else { return false };
    let result = match read_str(url) {
        Some(url) => Ok(url.to_string()),
        None => Err(UploadError::new(read_str(message).unwrap_or("upload failed"))),
    };
    editor.core.complete_upload(ticket, result).unwrap_or(false)
}

/// # Safety
/// `editor` must be live.
#[no_mangle]
pub unsafe extern "C" fn rte_editor_undo(editor: *mut RteEditor) -> bool {
    live(editor).is_some_and(|e| e.core.undo())
}

/// # Safety
/// `editor` must be live.
#[no_mangle]
pub unsafe extern "C" fn rte_editor_redo(editor: *mut RteEditor) -> bool {
    live(editor).is_some_and(|e| e.core.redo())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    unsafe fn take(s: *mut c_char) -> Option<String> {
        if s.is_null() {
            return None;
        }
        let out = CStr::from_ptr(s).to_str().unwrap().to_string();
        rte_string_free(s);
        Some(out)
    }

    #[test]
    fn session_through_c_abi() {
        unsafe {
            let html = c("<p>hello</p>");
            let e = rte_editor_new(html.as_ptr(), ptr::null(), false);
            assert!(!e.is_null());

            let sel = c(r#"{"type":"Text","anchor":{"path":[0],"offset":0},"head":{"path":[0],"offset":5}}"#);
            assert!(rte_editor_set_selection(e, sel.as_ptr()));
            let cmd = c(r#"{"command":"toggle_mark","mark":"italic"}"#);
            assert!(rte_editor_apply(e, cmd.as_ptr()));

            assert_eq!(take(rte_editor_take_change(e)).as_deref(), Some("<p><em>hello</em></p>"));
            assert_eq!(take(rte_editor_take_change(e)), None);
            assert!(rte_editor_undo(e));
            assert_eq!(take(rte_editor_html(e)).as_deref(), Some("<p>hello</p>"));
            rte_editor_free(e);
        }
    }

    #[test]
    fn bad_input_is_rejected() {
        unsafe {
            let e = rte_editor_new(ptr::null(), ptr::null(), false);
            let junk = c("not json");
            assert!(!rte_editor_apply(e, junk.as_ptr()));
            assert!(!rte_editor_apply(e, ptr::null()));
            assert!(!rte_editor_apply(ptr::null_mut(), junk.as_ptr()));

            let broken = c("<p>ok</p><p");
            assert!(!rte_editor_load_html(e, broken.as_ptr()));
            assert!(take(rte_editor_take_error(e)).is_some());
            assert!(!rte_editor_complete_upload(e, 7, ptr::null(), ptr::null()));
            rte_editor_free(e);
        }
    }

    #[test]
    fn uploads_go_through_tickets() {
        unsafe {
            let html = c("<p>x</p>");
            let e = rte_editor_new(html.as_ptr(), ptr::null(), true);
            let png = c("image/png");
            let bytes = [1u8, 2];
            let ticket = rte_editor_insert_image_bytes(e, bytes.as_ptr(), bytes.len(), png.as_ptr());
            assert_ne!(ticket, 0);
            assert_eq!(rte_editor_insert_image_bytes(e, bytes.as_ptr(), bytes.len(), png.as_ptr()), 0);

            let url = c("https://cdn/x.png");
            assert!(rte_editor_complete_upload(e, ticket, url.as_ptr(), ptr::null()));
            assert!(take(rte_editor_html(e)).is_some_and(|h| h.contains("<img src=\"https://cdn/x.png\"")));

            let ticket = rte_editor_insert_image_bytes(e, bytes.as_ptr(), bytes.len(), png.as_ptr());
            let before = take(rte_editor_html(e));
            let reason = c("offline");
            assert!(!rte_editor_complete_upload(e, ticket, ptr::null(), reason.as_ptr()));
            assert_eq!(take(rte_editor_take_error(e)).as_deref(), Some("image upload failed: offline"));
            assert_eq!(take(rte_editor_html(e)), before);
            rte_editor_free(e);
        }
    }

    #[test]
    fn images_are_embedded_without_an_uploader() {
        unsafe {
            let e = rte_editor_new(ptr::null(), ptr::null(), false);
            let png = c("image/png");
            let bytes = [1u8, 2];
            assert_eq!(rte_editor_insert_image_bytes(e, bytes.as_ptr(), bytes.len(), png.as_ptr()), 0);
            assert!(take(rte_editor_html(e)).is_some_and(|h| h.contains("src=\"data:image/png;base64,AQI=\"")));
            rte_editor_free(e);
        }
    }
}
