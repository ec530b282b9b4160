// SPDX-License-Identifier: MIT OR Apache-2.0
//! Factory for the standard test server.

use crate::error::{Result, ServerError};
use crate::server::{
    Arguments, Content, McpServer, PromptInfo, PromptMessage, TemplateParams, ToolInfo, str_arg,
};
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::json;
use std::io::Cursor;

/// Name used by [`create_default_server`].
pub const DEFAULT_SERVER_NAME: &str = "TestServer";

/// Version string served at `config://version`.
pub const SERVER_VERSION: &str = "2.0.1";

/// Edge length of the square produced by `get_image`.
pub const IMAGE_SIZE: u32 = 100;

/// Fill color of the image produced by `get_image`.
pub const IMAGE_COLOR: [u8; 3] = [155, 0, 0];

/// Build a fresh server named `name` with the standard capabilities:
///
/// | kind | name | behavior |
/// |---|---|---|
/// | tool | `greet` | `"Hello, {name}!"` |
/// | resource | `config://version` | `"2.0.1"` |
/// | tool | `get_image` | 100x100 red PNG |
/// | resource template | `users://{user_id}/profile` | JSON profile |
/// | prompt | `summarize_request` | summary request for `text` |
pub fn create_server(name: &str) -> Result<McpServer> {
    let mut server = McpServer::new(name);

    server.add_tool(
        ToolInfo::new("greet")
            .with_description("Greet someone by name.")
            .with_required("name"),
        greet,
    );
    server.add_resource("config://version", "get_version", get_version);
    server.add_tool(
        ToolInfo::new("get_image").with_description("Return a solid red square."),
        get_image,
    );
    server.add_resource_template("users://{user_id}/profile", "get_profile", get_profile)?;
    server.add_prompt(
        PromptInfo::new("summarize_request")
            .with_description("Generate a prompt asking for a summary.")
            .with_required("text"),
        summarize_request,
    );

    Ok(server)
}

/// [`create_server`] with [`DEFAULT_SERVER_NAME`].
pub fn create_default_server() -> Result<McpServer> {
    create_server(DEFAULT_SERVER_NAME)
}

fn greet(args: &Arguments) -> Result<Content> {
    let name = str_arg(args, "name")?;
    Ok(Content::text(format!("Hello, {name}!")))
}

fn get_version() -> Result<Content> {
    Ok(Content::text(SERVER_VERSION))
}

fn get_image(_args: &Arguments) -> Result<Content> {
    let img = RgbImage::from_pixel(IMAGE_SIZE, IMAGE_SIZE, Rgb(IMAGE_COLOR));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| ServerError::ImageEncoding {
            reason: e.to_string(),
        })?;
    Ok(Content::Image {
        data: buf.into_inner(),
        mime_type: "image/png".to_string(),
    })
}

fn get_profile(params: &TemplateParams) -> Result<Content> {
    let raw = params
        .get("user_id")
        .ok_or_else(|| ServerError::MissingArgument {
            argument: "user_id".to_string(),
        })?;
    let user_id: i64 = raw.parse().map_err(|_| ServerError::InvalidArgument {
        argument: "user_id".to_string(),
        reason: format!("expected an integer, got '{raw}'"),
    })?;
    Ok(Content::Json {
        value: json!({"name": format!("User {user_id}"), "status": "active"}),
    })
}

fn summarize_request(args: &Arguments) -> Result<Vec<PromptMessage>> {
    let text = str_arg(args, "text")?;
    Ok(vec![PromptMessage::user(format!(
        "Please summarize the following text:\n\n{text}"
    ))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::Role;
    use serde_json::Value;

    fn args(pairs: &[(&str, &str)]) -> Arguments {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    #[test]
    fn default_server_is_named_test_server() {
        let server = create_default_server().unwrap();
        assert_eq!(server.name(), "TestServer");
    }

    #[test]
    fn each_call_builds_an_independent_server() {
        let mut a = create_server("a").unwrap();
        let b = create_server("b").unwrap();
        a.add_tool(ToolInfo::new("extra"), |_| Ok(Content::text("x")));
        assert_eq!(a.list_tools().len(), 3);
        assert_eq!(b.list_tools().len(), 2);
    }

    #[test]
    fn registers_the_standard_capabilities() {
        let server = create_default_server().unwrap();
        let tools: Vec<_> = server.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(tools, vec!["get_image", "greet"]);
        assert_eq!(server.list_resources()[0].uri, "config://version");
        assert_eq!(
            server.list_resource_templates()[0].uri_template,
            "users://{user_id}/profile"
        );
        assert_eq!(server.list_prompts()[0].name, "summarize_request");
    }

    #[test]
    fn greet_formats_the_name() {
        let server = create_default_server().unwrap();
        let out = server.call_tool("greet", &args(&[("name", "World")])).unwrap();
        assert_eq!(out.as_text(), Some("Hello, World!"));
    }

    #[test]
    fn version_resource() {
        let server = create_default_server().unwrap();
        let out = server.read_resource("config://version").unwrap();
        assert_eq!(out.as_text(), Some("2.0.1"));
    }

    #[test]
    fn image_tool_returns_png() {
        let server = create_default_server().unwrap();
        let out = server.call_tool("get_image", &Arguments::new()).unwrap();
        let Content::Image { data, mime_type } = out else {
            panic!("expected image content");
        };
        assert_eq!(mime_type, "image/png");
        assert_eq!(&data[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory_with_format(&data, ImageFormat::Png)
            .unwrap()
            .to_rgb8();
        assert_eq!(decoded.dimensions(), (IMAGE_SIZE, IMAGE_SIZE));
        assert_eq!(decoded.get_pixel(50, 50).0, IMAGE_COLOR);
    }

    #[test]
    fn profile_template_references_the_id() {
        let server = create_default_server().unwrap();
        let out = server.read_resource("users://42/profile").unwrap();
        assert_eq!(
            out.as_json(),
            Some(&json!({"name": "User 42", "status": "active"}))
        );
    }

    #[test]
    fn profile_rejects_non_numeric_id() {
        let server = create_default_server().unwrap();
        let err = server.read_resource("users://abc/profile").unwrap_err();
        assert!(matches!(err, ServerError::InvalidArgument { .. }));
    }

    #[test]
    fn summarize_prompt_embeds_the_text() {
        let server = create_default_server().unwrap();
        let messages = server
            .get_prompt("summarize_request", &args(&[("text", "Rust is fast.")]))
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(
            messages[0].content,
            "Please summarize the following text:\n\nRust is fast."
        );
    }
}
