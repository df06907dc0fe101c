use crate::document::DocumentManager;
use crate::providers::*;
use anyhow::Result;
use crossbeam_channel::Sender;
use lsp_server::{ErrorCode, Message, Notification, Request, RequestId, Response};
use lsp_types::notification::{
    DidChangeTextDocument, DidCloseTextDocument, DidOpenTextDocument, DidSaveTextDocument,
    PublishDiagnostics,
};
use lsp_types::request::{
    Completion, DocumentSymbolRequest, Formatting, GotoDefinition, HoverRequest,
    PrepareRenameRequest, References, Rename, WorkspaceSymbolRequest,
};
use lsp_types::*;
use serde::{de::DeserializeOwned, Serialize};

/// Trait for sending LSP messages - allows mocking for tests
pub trait LspConnection {
    fn send_response(&self, response: Response) -> Result<()>;
    fn send_notification(&self, notification: Notification) -> Result<()>;
}

/// Message handler containing all LSP request/notification handling logic
pub struct MessageHandler {
    /// Channel for messages produced off the main loop (debounced
    /// diagnostics, missing-tool warnings). Absent in handler unit tests.
    outgoing: Option<Sender<Message>>,
    diagnostics_provider: DiagnosticsProvider,
    completion_provider: CompletionProvider,
    hover_provider: HoverProvider,
    definition_provider: DefinitionProvider,
    references_provider: ReferencesProvider,
    rename_provider: RenameProvider,
    symbols_provider: SymbolsProvider,
    formatting_provider: FormattingProvider,
}

impl MessageHandler {
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_outgoing(outgoing: Sender<Message>) -> Self {
        Self::build(Some(outgoing))
    }

    fn build(outgoing: Option<Sender<Message>>) -> Self {
        Self {
            outgoing,
            diagnostics_provider: DiagnosticsProvider::new(),
            completion_provider: CompletionProvider::new(),
            hover_provider: HoverProvider::new(),
            definition_provider: DefinitionProvider::new(),
            references_provider: ReferencesProvider::new(),
            rename_provider: RenameProvider::new(),
            symbols_provider: SymbolsProvider::new(),
            formatting_provider: FormattingProvider::new(),
        }
    }

    pub fn handle_request<C: LspConnection>(
        &self,
        connection: &C,
        req: Request,
        document_manager: &DocumentManager,
    ) -> Result<()> {
        let req = match Self::cast_request::<Completion>(req) {
            Ok((id, params)) => {
                let uri = &params.text_document_position.text_document.uri;
                let position = params.text_document_position.position;

                let result = CompletionResponse::Array(self.completion_provider.provide(
                    uri,
                    position,
                    document_manager,
                ));

                connection.send_response(Response::new_ok(id, result))?;
                return Ok(());
            }
            Err(req) => req,
        };

        let req = match Self::cast_request::<HoverRequest>(req) {
            Ok((id, params)) => {
                let uri = &params.text_document_position_params.text_document.uri;
                let position = params.text_document_position_params.position;

                let result = self.hover_provider.provide(uri, position, document_manager);

                connection.send_response(Response::new_ok(id, result))?;
                return Ok(());
            }
            Err(req) => req,
        };

        let req = match Self::cast_request::<GotoDefinition>(req) {
            Ok((id, params)) => {
                let uri = &params.text_document_position_params.text_document.uri;
                let position = params.text_document_position_params.position;

                let result = self
                    .definition_provider
                    .provide(uri, position, document_manager);

                connection.send_response(Response::new_ok(id, result))?;
                return Ok(());
            }
            Err(req) => req,
        };

        let req = match Self::cast_request::<References>(req) {
            Ok((id, params)) => {
                let uri = &params.text_document_position.text_document.uri;
                let position = params.text_document_position.position;
                let include_declaration = params.context.include_declaration;

                let result = self.references_provider.provide(
                    uri,
                    position,
                    include_declaration,
                    document_manager,
                );

                connection.send_response(Response::new_ok(id, result))?;
                return Ok(());
            }
            Err(req) => req,
        };

        let req = match Self::cast_request::<PrepareRenameRequest>(req) {
            Ok((id, params)) => {
                let uri = &params.text_document.uri;
                let position = params.position;

                let result = self.rename_provider.prepare(uri, position, document_manager);

                connection.send_response(Response::new_ok(id, result))?;
                return Ok(());
            }
            Err(req) => req,
        };

        let req = match Self::cast_request::<Rename>(req) {
            Ok((id, params)) => {
                let uri = &params.text_document_position.text_document.uri;
                let position = params.text_document_position.position;
                let new_name = &params.new_name;

                let result = self
                    .rename_provider
                    .rename(uri, position, new_name, document_manager);

                connection.send_response(Response::new_ok(id, result))?;
                return Ok(());
            }
            Err(req) => req,
        };

        let req = match Self::cast_request::<DocumentSymbolRequest>(req) {
            Ok((id, params)) => {
                let uri = &params.text_document.uri;

                let result = DocumentSymbolResponse::Nested(
                    self.symbols_provider.provide(uri, document_manager),
                );

                connection.send_response(Response::new_ok(id, result))?;
                return Ok(());
            }
            Err(req) => req,
        };

        let req = match Self::cast_request::<WorkspaceSymbolRequest>(req) {
            Ok((id, params)) => {
                let result = document_manager.workspace_project().map(|project| {
                    document_manager
                        .symbol_index()
                        .search(&params.query, &project)
                });

                connection.send_response(Response::new_ok(id, result))?;
                return Ok(());
            }
            Err(req) => req,
        };

        let req = match Self::cast_request::<Formatting>(req) {
            Ok((id, params)) => {
                let uri = &params.text_document.uri;

                let result = document_manager.get(uri).and_then(|doc| {
                    self.formatting_provider
                        .format_document(&doc.text, self.outgoing.as_ref())
                });

                connection.send_response(Response::new_ok(id, result))?;
                return Ok(());
            }
            Err(req) => req,
        };

        connection.send_response(Response::new_err(
            req.id.clone(),
            ErrorCode::MethodNotFound as i32,
            format!("unknown method `{}`", req.method),
        ))?;
        Ok(())
    }

    pub fn handle_notification<C: LspConnection>(
        &self,
        connection: &C,
        not: Notification,
        document_manager: &mut DocumentManager,
    ) -> Result<()> {
        let not = match Self::cast_notification::<DidOpenTextDocument>(not) {
            Ok(params) => {
                let uri = params.text_document.uri.clone();
                document_manager.open(params);
                self.schedule_diagnostics(&uri, document_manager);
                return Ok(());
            }
            Err(not) => not,
        };

        let not = match Self::cast_notification::<DidChangeTextDocument>(not) {
            Ok(params) => {
                document_manager.change(params);
                return Ok(());
            }
            Err(not) => not,
        };

        let not = match Self::cast_notification::<DidSaveTextDocument>(not) {
            Ok(params) => {
                let uri = params.text_document.uri;
                self.schedule_diagnostics(&uri, document_manager);
                return Ok(());
            }
            Err(not) => not,
        };

        match Self::cast_notification::<DidCloseTextDocument>(not) {
            Ok(params) => {
                let uri = params.text_document.uri.clone();
                document_manager.close(params);
                // Clear diagnostics on close
                Self::send_notification::<PublishDiagnostics>(
                    connection,
                    PublishDiagnosticsParams {
                        uri,
                        diagnostics: vec![],
                        version: None,
                    },
                )?;
                return Ok(());
            }
            Err(_not) => {
                // Unknown notification, ignore
            }
        };

        Ok(())
    }

    fn schedule_diagnostics(&self, uri: &Uri, document_manager: &DocumentManager) {
        let Some(outgoing) = &self.outgoing else {
            return;
        };
        let Some(path) = document_manager.path_for(uri) else {
            return;
        };
        let Some(project) = document_manager.project_for(uri) else {
            return;
        };
        self.diagnostics_provider.schedule(
            uri,
            path,
            project.project_folder.clone(),
            outgoing.clone(),
        );
    }

    fn cast_request<R>(req: Request) -> std::result::Result<(RequestId, R::Params), Request>
    where
        R: lsp_types::request::Request,
        R::Params: DeserializeOwned,
    {
        match req.extract(R::METHOD) {
            Ok(params) => Ok(params),
            Err(lsp_server::ExtractError::MethodMismatch(req)) => Err(req),
            Err(lsp_server::ExtractError::JsonError { method, error }) => {
                tracing::error!("Failed to deserialize request {}: {}", method, error);
                Err(Request::new(
                    RequestId::from(0),
                    method.to_string(),
                    serde_json::Value::Null,
                ))
            }
        }
    }

    fn cast_notification<N>(not: Notification) -> std::result::Result<N::Params, Notification>
    where
        N: lsp_types::notification::Notification,
        N::Params: DeserializeOwned,
    {
        match not.extract(N::METHOD) {
            Ok(params) => Ok(params),
            Err(lsp_server::ExtractError::MethodMismatch(not)) => Err(not),
            Err(lsp_server::ExtractError::JsonError { method, error }) => {
                tracing::error!("Failed to deserialize notification {}: {}", method, error);
                Err(Notification::new(
                    method.to_string(),
                    serde_json::Value::Null,
                ))
            }
        }
    }

    fn send_notification<N>(connection: &impl LspConnection, params: N::Params) -> Result<()>
    where
        N: lsp_types::notification::Notification,
        N::Params: Serialize,
    {
        let not = Notification::new(N::METHOD.to_string(), params);
        connection.send_notification(not)?;
        Ok(())
    }
}

impl Default for MessageHandler {
    fn default() -> Self {
        Self::new()
    }
}
