//! Protocol engine: parses a request, dispatches the verb, renders the
//! response envelope.
//!
//! Protocol errors are not faults. Every outcome, including badVerb, is a
//! well-formed XML document served with HTTP 200; only infrastructure
//! failures (upstream outage, database loss) escape as `ProviderError`.

use chrono::Utc;

use crate::catalog::{CatalogAdapter, ListFilter};
use crate::config::{
    format_datestamp, is_valid_datestamp, Config, COMPRESSIONS, DELETED_RECORD_POLICY,
    EARLIEST_DATESTAMP, GRANULARITY, IDENTIFIER_PREFIX, PROTOCOL_VERSION,
};
use crate::error::{ProtocolError, Result};
use crate::metadata::WriterRegistry;
use crate::record::{header_to_xml, record_to_xml};
use crate::setspec::{decode_query, SetSpec};
use crate::token::ResumptionToken;
use crate::types::RecordHeader;
use crate::xml::XmlElement;

const OAI_NAMESPACE: &str = "http://www.openarchives.org/OAI/2.0/";
const OAI_SCHEMA: &str = "http://www.openarchives.org/OAI/2.0/OAI-PMH.xsd";
const OAI_IDENTIFIER_NAMESPACE: &str = "http://www.openarchives.org/OAI/2.0/oai-identifier";
const OAI_IDENTIFIER_SCHEMA: &str =
    "http://www.openarchives.org/OAI/2.0/oai-identifier.xsd";

/// One incoming protocol request, already split into its arguments.
///
/// The transport layer (HTTP query string or CLI flags) produces this; the
/// engine does all validation itself so that transports stay dumb.
#[derive(Debug, Clone, Default)]
pub struct OaiRequest {
    /// The verb argument. Absent or unknown yields badVerb.
    pub verb: Option<String>,

    /// metadataPrefix argument.
    pub metadata_prefix: Option<String>,

    /// identifier argument.
    pub identifier: Option<String>,

    /// set argument.
    pub set: Option<String>,

    /// from argument.
    pub from: Option<String>,

    /// until argument.
    pub until: Option<String>,

    /// resumptionToken argument.
    pub resumption_token: Option<String>,
}

impl OaiRequest {
    /// Request with only a verb set.
    #[must_use]
    pub fn for_verb(verb: impl Into<String>) -> Self {
        Self {
            verb: Some(verb.into()),
            ..Self::default()
        }
    }
}

/// The protocol engine. One instance serves every request; it holds the
/// catalog adapter chosen at startup and the format writer registry.
pub struct OaiProvider {
    config: Config,
    adapter: Box<dyn CatalogAdapter>,
    registry: WriterRegistry,
}

/// Either the verb's payload element or a protocol error to encode.
type DispatchOutcome = std::result::Result<XmlElement, ProtocolError>;

impl OaiProvider {
    /// Create a provider with the standard format registry.
    #[must_use]
    pub fn new(config: Config, adapter: Box<dyn CatalogAdapter>) -> Self {
        Self {
            config,
            adapter,
            registry: WriterRegistry::standard(),
        }
    }

    /// Create a provider with a custom format registry.
    #[must_use]
    pub fn with_registry(
        config: Config,
        adapter: Box<dyn CatalogAdapter>,
        registry: WriterRegistry,
    ) -> Self {
        Self {
            config,
            adapter,
            registry,
        }
    }

    /// Handle one request, producing the complete response document.
    ///
    /// Errors returned here are infrastructure failures only; every
    /// protocol-level problem is already encoded into the document.
    pub fn handle(&self, request: &OaiRequest) -> Result<String> {
        let outcome = self.dispatch(request)?;

        let mut envelope = XmlElement::new("OAI-PMH")
            .attr("xmlns", OAI_NAMESPACE)
            .attr("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance")
            .attr(
                "xsi:schemaLocation",
                format!("{OAI_NAMESPACE} {OAI_SCHEMA}"),
            )
            .child(
                XmlElement::new("responseDate")
                    .text(format_datestamp(&Utc::now().naive_utc())),
            );

        match outcome {
            Ok(payload) => {
                envelope.push(self.request_element(request, true));
                envelope.push(payload);
            }
            Err(protocol_error) => {
                tracing::debug!(
                    code = protocol_error.code(),
                    verb = request.verb.as_deref().unwrap_or(""),
                    "Request failed with protocol error"
                );
                // Argument attributes are not echoed on an error response:
                // the arguments themselves may be what is illegal.
                envelope.push(self.request_element(request, false));
                envelope.push(
                    XmlElement::new("error")
                        .attr("code", protocol_error.code())
                        .text(protocol_error.message()),
                );
            }
        }

        Ok(envelope.render_document())
    }

    fn dispatch(&self, request: &OaiRequest) -> Result<DispatchOutcome> {
        let Some(verb) = request.verb.as_deref() else {
            return Ok(Err(ProtocolError::BadVerb(
                "the verb argument is required".to_string(),
            )));
        };

        match verb {
            "Identify" => Ok(self.identify(request)),
            "ListMetadataFormats" => Ok(self.list_metadata_formats(request)),
            "GetRecord" => self.get_record(request),
            "ListRecords" => self.list_items(request, true),
            "ListIdentifiers" => self.list_items(request, false),
            "ListSets" => self.list_sets(request),
            other => Ok(Err(ProtocolError::BadVerb(format!(
                "'{other}' is not a legal OAI-PMH verb"
            )))),
        }
    }

    /// The `<request>` element echoing the base URL and, on success, the
    /// request arguments.
    fn request_element(&self, request: &OaiRequest, echo_arguments: bool) -> XmlElement {
        let mut element = XmlElement::new("request");
        if echo_arguments {
            let arguments = [
                ("verb", &request.verb),
                ("identifier", &request.identifier),
                ("metadataPrefix", &request.metadata_prefix),
                ("set", &request.set),
                ("from", &request.from),
                ("until", &request.until),
                ("resumptionToken", &request.resumption_token),
            ];
            for (name, value) in arguments {
                if let Some(value) = value {
                    element = element.attr(name, value.clone());
                }
            }
        }
        element.text(self.config.base_url.clone())
    }

    fn identify(&self, request: &OaiRequest) -> DispatchOutcome {
        if request.identifier.is_some()
            || request.metadata_prefix.is_some()
            || request.set.is_some()
            || request.from.is_some()
            || request.until.is_some()
            || request.resumption_token.is_some()
        {
            return Err(ProtocolError::BadArgument(
                "Identify takes no arguments".to_string(),
            ));
        }

        let mut identify = XmlElement::new("Identify")
            .child(XmlElement::new("repositoryName").text(self.config.repository_name.clone()))
            .child(XmlElement::new("baseURL").text(self.config.base_url.clone()))
            .child(XmlElement::new("protocolVersion").text(PROTOCOL_VERSION))
            .child(XmlElement::new("adminEmail").text(self.config.admin_email.clone()))
            .child(XmlElement::new("earliestDatestamp").text(EARLIEST_DATESTAMP))
            .child(XmlElement::new("deletedRecord").text(DELETED_RECORD_POLICY))
            .child(XmlElement::new("granularity").text(GRANULARITY));
        for compression in COMPRESSIONS {
            identify.push(XmlElement::new("compression").text(compression));
        }

        let repository_identifier = self.config.repository_identifier();
        identify.push(
            XmlElement::new("description").child(
                XmlElement::new("oai-identifier")
                    .attr("xmlns", OAI_IDENTIFIER_NAMESPACE)
                    .attr("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance")
                    .attr(
                        "xsi:schemaLocation",
                        format!("{OAI_IDENTIFIER_NAMESPACE} {OAI_IDENTIFIER_SCHEMA}"),
                    )
                    .child(XmlElement::new("scheme").text("oai"))
                    .child(
                        XmlElement::new("repositoryIdentifier").text(repository_identifier),
                    )
                    .child(XmlElement::new("delimiter").text(":"))
                    .child(
                        XmlElement::new("sampleIdentifier")
                            .text(format!("{IDENTIFIER_PREFIX}:10.5072/example-full")),
                    ),
            ),
        );

        Ok(identify)
    }

    fn list_metadata_formats(&self, request: &OaiRequest) -> DispatchOutcome {
        if request.metadata_prefix.is_some()
            || request.set.is_some()
            || request.from.is_some()
            || request.until.is_some()
            || request.resumption_token.is_some()
        {
            return Err(ProtocolError::BadArgument(
                "ListMetadataFormats takes only an identifier".to_string(),
            ));
        }

        // The identifier argument is accepted but ignored: every item is
        // available in every advertised format.
        let mut element = XmlElement::new("ListMetadataFormats");
        for format in self.registry.formats() {
            element.push(
                XmlElement::new("metadataFormat")
                    .child(XmlElement::new("metadataPrefix").text(format.prefix))
                    .child(XmlElement::new("schema").text(format.schema))
                    .child(XmlElement::new("metadataNamespace").text(format.namespace)),
            );
        }
        Ok(element)
    }

    fn get_record(&self, request: &OaiRequest) -> Result<DispatchOutcome> {
        if request.set.is_some()
            || request.from.is_some()
            || request.until.is_some()
            || request.resumption_token.is_some()
        {
            return Ok(Err(ProtocolError::BadArgument(
                "GetRecord takes only identifier and metadataPrefix".to_string(),
            )));
        }
        let Some(identifier) = request.identifier.as_deref() else {
            return Ok(Err(ProtocolError::BadArgument(
                "the identifier argument is required".to_string(),
            )));
        };
        let Some(prefix) = request.metadata_prefix.as_deref() else {
            return Ok(Err(ProtocolError::BadArgument(
                "the metadataPrefix argument is required".to_string(),
            )));
        };
        let Some(writer) = self.registry.get(prefix) else {
            return Ok(Err(ProtocolError::CannotDisseminateFormat(
                prefix.to_string(),
            )));
        };

        // "doi:10.5072/x" -> "10.5072/x"; a bare identifier passes through.
        let native_id = identifier
            .split_once(':')
            .map_or(identifier, |(_, rest)| rest);

        match self.adapter.fetch_by_id(native_id)? {
            Some(record) => {
                Ok(Ok(XmlElement::new("GetRecord").child(record_to_xml(&record, writer))))
            }
            None => Ok(Err(ProtocolError::IdDoesNotExist(identifier.to_string()))),
        }
    }

    /// Shared implementation for ListRecords and ListIdentifiers; the two
    /// differ only in whether metadata bodies are rendered.
    fn list_items(&self, request: &OaiRequest, with_metadata: bool) -> Result<DispatchOutcome> {
        let verb = if with_metadata {
            "ListRecords"
        } else {
            "ListIdentifiers"
        };

        // A resumption token carries the complete original arguments and
        // is authoritative; direct arguments only apply on the first call.
        let token = match request.resumption_token.as_deref() {
            Some(raw) => match ResumptionToken::decode(raw) {
                Ok(token) if token.verb == verb => Some(token),
                Ok(token) => {
                    return Ok(Err(ProtocolError::BadResumptionToken(format!(
                        "token was issued for {}, not {verb}",
                        token.verb
                    ))));
                }
                Err(e) => return Ok(Err(e)),
            },
            None => None,
        };

        let (prefix, set, from, until, cursor) = match &token {
            Some(token) => (
                token.metadata_prefix.clone(),
                token.set.clone(),
                token.from.clone(),
                token.until.clone(),
                Some(token.cursor.clone()),
            ),
            None => (
                request.metadata_prefix.clone(),
                request.set.clone(),
                request.from.clone(),
                request.until.clone(),
                None,
            ),
        };

        let Some(prefix) = prefix else {
            return Ok(Err(ProtocolError::BadArgument(
                "the metadataPrefix argument is required".to_string(),
            )));
        };
        for (name, value) in [("from", &from), ("until", &until)] {
            if let Some(value) = value {
                if !is_valid_datestamp(value) {
                    return Ok(Err(ProtocolError::BadArgument(format!(
                        "{name} is not a valid datestamp: '{value}'"
                    ))));
                }
            }
        }
        let Some(writer) = self.registry.get(&prefix) else {
            return Ok(Err(ProtocolError::CannotDisseminateFormat(prefix)));
        };

        let set_raw = set.as_deref().unwrap_or("");
        let scoping = SetSpec::decode(set_raw);
        let filter = ListFilter {
            query: decode_query(set_raw),
            provider_id: scoping.provider_id,
            client_id: scoping.client_id,
            from: from.clone(),
            until: until.clone(),
            page_size: self.config.page_size,
        };

        let page = self.adapter.list_page(&filter, cursor.as_deref())?;

        if page.records.is_empty() && token.is_none() {
            return Ok(Err(ProtocolError::NoRecordsMatch));
        }

        let mut element = XmlElement::new(verb);
        for record in &page.records {
            if with_metadata {
                element.push(record_to_xml(record, writer));
            } else {
                element.push(header_to_xml(&RecordHeader::for_record(record)));
            }
        }

        match page.next_cursor {
            Some(next_cursor) => {
                let next_token = ResumptionToken {
                    verb: verb.to_string(),
                    metadata_prefix: Some(prefix),
                    set,
                    from,
                    until,
                    cursor: next_cursor,
                    complete_list_size: page.total,
                };
                let mut token_element =
                    XmlElement::new("resumptionToken").text(next_token.encode());
                if let Some(size) = page.total {
                    token_element = token_element.attr("completeListSize", size.to_string());
                }
                element.push(token_element);
            }
            None => {
                // Closing an in-flight sequence requires an empty token so
                // the harvester knows the list is complete.
                if token.is_some() {
                    element.push(XmlElement::new("resumptionToken"));
                }
            }
        }

        Ok(Ok(element))
    }

    fn list_sets(&self, request: &OaiRequest) -> Result<DispatchOutcome> {
        let offset = match request.resumption_token.as_deref() {
            Some(raw) => {
                let token = match ResumptionToken::decode(raw) {
                    Ok(token) if token.verb == "ListSets" => token,
                    Ok(token) => {
                        return Ok(Err(ProtocolError::BadResumptionToken(format!(
                            "token was issued for {}, not ListSets",
                            token.verb
                        ))));
                    }
                    Err(e) => return Ok(Err(e)),
                };
                match token.offset_cursor() {
                    Ok(offset) => offset,
                    Err(e) => return Ok(Err(e)),
                }
            }
            None => 0,
        };

        let catalog = self.adapter.list_sets()?;
        if offset > 0 && offset >= catalog.sets.len() {
            return Ok(Err(ProtocolError::BadResumptionToken(format!(
                "offset {offset} is beyond the end of the set catalog"
            ))));
        }

        let end = (offset + self.config.page_size).min(catalog.sets.len());
        let mut element = XmlElement::new("ListSets");
        for set in &catalog.sets[offset..end] {
            element.push(
                XmlElement::new("set")
                    .child(XmlElement::new("setSpec").text(set.id.to_uppercase()))
                    .child(XmlElement::new("setName").text(set.name.clone())),
            );
        }

        if end < catalog.sets.len() {
            let next_token = ResumptionToken {
                verb: "ListSets".to_string(),
                cursor: end.to_string(),
                complete_list_size: Some(catalog.total),
                ..ResumptionToken::default()
            };
            element.push(
                XmlElement::new("resumptionToken")
                    .attr("completeListSize", catalog.total.to_string())
                    .text(next_token.encode()),
            );
        } else if request.resumption_token.is_some() {
            element.push(XmlElement::new("resumptionToken"));
        }

        Ok(Ok(element))
    }
}
