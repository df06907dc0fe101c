use anyhow::Result;
use elmls_lsp::document::DocumentManager;
use elmls_lsp::message_handler::{LspConnection, MessageHandler};
use lsp_server::{Connection, ErrorCode, Message, Notification, Response};
use lsp_types::*;
use std::error::Error;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing_subscriber::EnvFilter;

// Implement LspConnection for the real lsp_server::Connection
struct ConnectionWrapper<'a>(&'a Connection);

impl LspConnection for ConnectionWrapper<'_> {
    fn send_response(&self, response: Response) -> Result<()> {
        self.0.sender.send(Message::Response(response))?;
        Ok(())
    }

    fn send_notification(&self, notification: Notification) -> Result<()> {
        self.0.sender.send(Message::Notification(notification))?;
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error + Sync + Send>> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let (connection, io_threads) = Connection::stdio();

    let server_capabilities = serde_json::to_value(ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Options(
            TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::FULL),
                save: Some(TextDocumentSyncSaveOptions::Supported(true)),
                ..Default::default()
            },
        )),
        completion_provider: Some(CompletionOptions {
            trigger_characters: Some(vec![".".to_string()]),
            ..Default::default()
        }),
        hover_provider: Some(HoverProviderCapability::Simple(true)),
        definition_provider: Some(OneOf::Left(true)),
        references_provider: Some(OneOf::Left(true)),
        document_symbol_provider: Some(OneOf::Left(true)),
        workspace_symbol_provider: Some(OneOf::Left(true)),
        rename_provider: Some(OneOf::Right(RenameOptions {
            prepare_provider: Some(true),
            work_done_progress_options: WorkDoneProgressOptions::default(),
        })),
        document_formatting_provider: Some(OneOf::Left(true)),
        ..Default::default()
    })
    .unwrap();

    let initialization_params = connection.initialize(server_capabilities)?;
    let params: InitializeParams = serde_json::from_value(initialization_params)?;

    main_loop(connection, params)?;

    io_threads.join()?;

    Ok(())
}

fn main_loop(connection: Connection, params: InitializeParams) -> Result<()> {
    let mut document_manager = DocumentManager::new();

    #[allow(deprecated)] // root_uri is deprecated but still what clients send
    if let Some(root) = params
        .root_uri
        .as_ref()
        .and_then(|uri| elmls_core::uri::uri_to_path(uri.as_str()))
    {
        tracing::info!("workspace root: {:?}", root);
        document_manager.set_workspace_root(root);
    }

    let message_handler = MessageHandler::with_outgoing(connection.sender.clone());
    let connection_wrapper = ConnectionWrapper(&connection);

    for msg in &connection.receiver {
        match msg {
            Message::Request(req) => {
                if connection.handle_shutdown(&req)? {
                    return Ok(());
                }

                // Any failure inside a handler surfaces as an internal
                // error response; nothing takes the server down.
                let id = req.id.clone();
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    message_handler.handle_request(&connection_wrapper, req, &document_manager)
                }));
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        tracing::error!("request handler failed: {err}");
                        connection_wrapper.send_response(Response::new_err(
                            id,
                            ErrorCode::InternalError as i32,
                            err.to_string(),
                        ))?;
                    }
                    Err(_) => {
                        tracing::error!("request handler panicked");
                        connection_wrapper.send_response(Response::new_err(
                            id,
                            ErrorCode::InternalError as i32,
                            "internal error".to_string(),
                        ))?;
                    }
                }
            }
            Message::Notification(not) => {
                if not.method == "exit" {
                    // Exit without a preceding shutdown request.
                    std::process::exit(1);
                }
                if let Err(err) = message_handler.handle_notification(
                    &connection_wrapper,
                    not,
                    &mut document_manager,
                ) {
                    // Notifications swallow errors.
                    tracing::error!("notification handler failed: {err}");
                }
            }
            Message::Response(_resp) => {
                // Client responses to our requests - we don't currently send any
            }
        }
    }

    Ok(())
}
