use crate::{App, svg};

/// File produced by an export: name, dialog filter and MIME type.
pub struct ExportFile {
    pub name: &'static str,
    pub filter: (&'static str, &'static [&'static str]),
    pub mime: &'static str,
}

pub const SVG_FILE: ExportFile = ExportFile {
    name: "circuit.svg",
    filter: ("SVG files", &["svg"]),
    mime: "image/svg+xml",
};

impl App {
    pub fn svg_document(&self) -> String {
        svg::render_svg(&self.circuit().scene)
    }

    pub fn export_svg(&self) -> Result<(), Box<dyn std::error::Error>> {
        save_text(&SVG_FILE, &self.svg_document())
    }
}

/// Asks for a destination and writes `contents` there. Cancelling is not an error.
#[cfg(not(target_arch = "wasm32"))]
pub fn save_text(file: &ExportFile, contents: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (filter, extensions) = file.filter;
    let Some(path) = rfd::FileDialog::new()
        .add_filter(filter, extensions)
        .set_file_name(file.name)
        .save_file()
    else {
        log::debug!("Export of {} cancelled", file.name);
        return Ok(());
    };

    std::fs::write(&path, contents)?;
    log::info!("Exported {} to: {}", file.name, path.display());
    Ok(())
}

/// Hands `contents` to the browser as a download.
#[cfg(target_arch = "wasm32")]
pub fn save_text(file: &ExportFile, contents: &str) -> Result<(), Box<dyn std::error::Error>> {
    use wasm_bindgen::{JsCast, JsValue};
    use web_sys::{Blob, BlobPropertyBag, HtmlElement, Url};

    fn js(err: JsValue) -> Box<dyn std::error::Error> {
        format!("{err:?}").into()
    }

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or("no document to attach the download to")?;

    let parts = js_sys::Array::of1(&JsValue::from_str(contents));
    let options = BlobPropertyBag::new();
    options.set_type(file.mime);
    let blob = Blob::new_with_str_sequence_and_options(&parts, &options).map_err(js)?;
    let url = Url::create_object_url_with_blob(&blob).map_err(js)?;

    let link = document
        .create_element("a")
        .map_err(js)?
        .dyn_into::<HtmlElement>()
        .map_err(|el| format!("{el:?} is not an HtmlElement"))?;
    link.set_attribute("href", &url).map_err(js)?;
    link.set_attribute("download", file.name).map_err(js)?;
    link.click();
    Url::revoke_object_url(&url).map_err(js)?;

    log::info!("Exported {} as download", file.name);
    Ok(())
}
