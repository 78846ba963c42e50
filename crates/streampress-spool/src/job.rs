// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The print job orchestrator. One job instance runs at most one print
// operation; documents the client does not accept natively are bridged
// through a converter running on its own thread, feeding the client
// through a bounded pipe.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use streampress_core::error::{Result, StreampressError};
use streampress_core::{JobId, JobState, JobTicket, SpoolConfig};

use crate::capability::CapabilityFacade;
use crate::client::OutputClient;
use crate::pipe::pipe;
use crate::registry::{ConverterChain, ConverterRegistry};
use crate::request::{DocData, DocumentRequest};

/// A single print submission bound to one output client.
pub struct SpoolJob {
    id: JobId,
    client: Arc<dyn OutputClient>,
    registry: ConverterRegistry,
    facade: CapabilityFacade,
    config: SpoolConfig,
    state: Mutex<JobState>,
}

impl SpoolJob {
    pub fn new(
        client: Arc<dyn OutputClient>,
        registry: ConverterRegistry,
        config: SpoolConfig,
    ) -> Self {
        let facade = CapabilityFacade::new(client.clone(), registry.clone());
        Self {
            id: JobId::new(),
            client,
            registry,
            facade,
            config,
            state: Mutex::new(JobState::Idle),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn state(&self) -> JobState {
        *lock_state(&self.state)
    }

    /// Run the print operation to completion.
    ///
    /// Refusals before the job is accepted (a second submission on the
    /// same job, a format nobody can bridge) come back as `Err`. Once
    /// accepted, the outcome is reported through the ticket: `Done`, or
    /// `Failed` with the error message. A converter-task failure takes
    /// priority over whatever the foreground delivery reported, since
    /// the foreground symptom (truncated stream, broken pipe) is a
    /// consequence of it.
    #[instrument(skip(self, request), fields(job = %self.id, flavor = %request.flavor))]
    pub fn print(&self, request: DocumentRequest) -> Result<JobTicket> {
        {
            let mut state = lock_state(&self.state);
            if *state != JobState::Idle {
                warn!(state = ?*state, "rejecting submission on non-idle job");
                return Err(StreampressError::JobAlreadyActive);
            }
            *state = JobState::Busy;
        }
        let guard = BusyGuard::new(&self.state);

        if !self.facade.is_flavor_supported(&request.flavor) {
            // Guard drop records the failed state.
            return Err(StreampressError::UnsupportedFormat(
                request.flavor.to_string(),
            ));
        }

        let created_at = Utc::now();
        let document_name = request.document_name();
        let document_hash = request.document_hash();

        let outcome = self.run(request);
        let (state, error_message) = match &outcome {
            Ok(()) => {
                info!(document = %document_name, "job done");
                (JobState::Done, None)
            }
            Err(e) => {
                warn!(document = %document_name, error = %e, "job failed");
                (JobState::Failed, Some(e.to_string()))
            }
        };
        guard.settle(state);

        Ok(JobTicket {
            id: self.id,
            document_name,
            document_hash,
            state,
            created_at,
            finished_at: Utc::now(),
            error_message,
        })
    }

    fn run(&self, request: DocumentRequest) -> Result<()> {
        if self.client.is_flavor_supported(&request.flavor) {
            debug!("direct delivery");
            let mut request = request;
            return self.client.create_job().print(&mut request);
        }
        let natives = self.client.supported_flavors();
        let chain = self
            .registry
            .first_chain(&request.flavor, &natives)
            .ok_or_else(|| StreampressError::NoConverterAvailable {
                from: request.flavor.to_string(),
            })?;
        self.run_pipelined(request, chain)
    }

    /// Bridged delivery: the converter runs on its own thread writing
    /// into the pipe, while this thread hands the read end to the
    /// client as a stream-flavored request. The bounded window keeps
    /// both sides running concurrently regardless of document size.
    fn run_pipelined(&self, request: DocumentRequest, chain: ConverterChain) -> Result<()> {
        debug!(bridge = %chain.target, "pipelined delivery");
        let (writer, reader) = pipe(self.config.pipe_window_bytes);

        let captured: Arc<Mutex<Option<StreampressError>>> = Arc::new(Mutex::new(None));
        let worker_slot = Arc::clone(&captured);
        let factory = chain.factory;
        let attributes = request.attributes.clone();

        let worker = thread::Builder::new()
            .name(format!("convert-{}", self.id))
            .spawn(move || {
                let outcome = factory
                    .make_converter(Box::new(writer))
                    .and_then(|mut converter| converter.run(request));
                if let Err(e) = outcome {
                    lock_or_recover(&worker_slot).get_or_insert(e);
                }
                // The converter (and with it the write end) drops here,
                // ending the stream for the reader.
            })?;

        // The delivered descriptor is the negotiated client-native
        // flavor itself, so it compares equal to what the client
        // declared; the payload is always the pipe's read end.
        let mut bridged = DocumentRequest::new(
            DocData::Stream(Box::new(reader)),
            chain.target.clone(),
            attributes,
        );
        let delivery = self.client.create_job().print(&mut bridged);
        // If delivery bailed early, dropping the read end breaks the
        // converter's writes and unblocks it.
        drop(bridged);

        if worker.join().is_err() {
            return Err(StreampressError::ConversionIo(
                "converter task panicked".to_string(),
            ));
        }
        if let Some(e) = lock_or_recover(&captured).take() {
            return Err(e);
        }
        delivery
    }
}

fn lock_state(state: &Mutex<JobState>) -> MutexGuard<'_, JobState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn lock_or_recover<'a>(
    slot: &'a Mutex<Option<StreampressError>>,
) -> MutexGuard<'a, Option<StreampressError>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Marks the job failed unless the operation settles a state first.
/// Covers panics and early error returns between claim and completion.
struct BusyGuard<'a> {
    state: &'a Mutex<JobState>,
    settled: bool,
}

impl<'a> BusyGuard<'a> {
    fn new(state: &'a Mutex<JobState>) -> Self {
        Self {
            state,
            settled: false,
        }
    }

    fn settle(mut self, state: JobState) {
        *lock_state(self.state) = state;
        self.settled = true;
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            *lock_state(self.state) = JobState::Failed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientJob;
    use crate::registry::{ConverterFactory, StaticFactoryLookup, StreamConverter};
    use std::io::{Read, Write};
    use streampress_core::{Attribute, AttributeCategory, DataRepr, DocFlavor, PrintAttributes};

    fn ps_stream() -> DocFlavor {
        DocFlavor::new("application/postscript", DataRepr::Stream)
    }

    fn pages_flavor() -> DocFlavor {
        DocFlavor::new("application/x-pages", DataRepr::Pages)
    }

    /// Client accepting PostScript streams; drains them into a shared
    /// buffer.
    struct CollectingClient {
        received: Arc<Mutex<Vec<u8>>>,
    }

    impl OutputClient for CollectingClient {
        fn supported_flavors(&self) -> Vec<DocFlavor> {
            vec![ps_stream()]
        }

        fn supported_attribute_categories(&self) -> Vec<AttributeCategory> {
            Vec::new()
        }

        fn default_attribute_value(&self, _category: AttributeCategory) -> Option<Attribute> {
            None
        }

        fn supported_attribute_values(
            &self,
            _category: AttributeCategory,
            _flavor: Option<&DocFlavor>,
            _attrs: &PrintAttributes,
        ) -> Vec<Attribute> {
            Vec::new()
        }

        fn create_job(&self) -> Box<dyn ClientJob> {
            struct Drain {
                received: Arc<Mutex<Vec<u8>>>,
            }
            impl ClientJob for Drain {
                fn print(&mut self, request: &mut DocumentRequest) -> Result<()> {
                    let mut buf = Vec::new();
                    match &mut request.data {
                        DocData::Bytes(b) => buf.extend_from_slice(b),
                        DocData::Stream(s) => {
                            s.read_to_end(&mut buf)?;
                        }
                        DocData::Pages(_) => unreachable!("client accepts byte formats only"),
                    }
                    self.received.lock().expect("lock").extend(buf);
                    Ok(())
                }
            }
            Box::new(Drain {
                received: Arc::clone(&self.received),
            })
        }
    }

    /// Converter that upper-cases byte payloads into its sink.
    struct UppercaseFactory {
        fail_after: Option<usize>,
    }

    impl ConverterFactory for UppercaseFactory {
        fn input_flavors(&self) -> Vec<DocFlavor> {
            vec![DocFlavor::new("text/plain", DataRepr::Bytes)]
        }

        fn output_mime(&self) -> String {
            "application/postscript".into()
        }

        fn make_converter(
            &self,
            sink: Box<dyn Write + Send>,
        ) -> Result<Box<dyn StreamConverter>> {
            struct Upper {
                sink: Box<dyn Write + Send>,
                fail_after: Option<usize>,
            }
            impl StreamConverter for Upper {
                fn run(&mut self, request: DocumentRequest) -> Result<()> {
                    let DocData::Bytes(bytes) = request.data else {
                        return Err(StreampressError::ConversionIo(
                            "expected byte payload".into(),
                        ));
                    };
                    let upper = bytes.to_ascii_uppercase();
                    match self.fail_after {
                        None => self.sink.write_all(&upper)?,
                        Some(n) => {
                            self.sink.write_all(&upper[..n.min(upper.len())])?;
                            return Err(StreampressError::ConversionIo("boom".into()));
                        }
                    }
                    Ok(())
                }
            }
            Ok(Box::new(Upper {
                sink,
                fail_after: self.fail_after,
            }))
        }
    }

    fn job_with(
        fail_after: Option<usize>,
        received: Arc<Mutex<Vec<u8>>>,
        window: usize,
    ) -> SpoolJob {
        let client = Arc::new(CollectingClient { received });
        let lookup = StaticFactoryLookup::new(vec![Arc::new(UppercaseFactory { fail_after })]);
        let registry = ConverterRegistry::new(Arc::new(lookup));
        let config = SpoolConfig {
            pipe_window_bytes: window,
            ..SpoolConfig::default()
        };
        SpoolJob::new(client, registry, config)
    }

    fn text_request(payload: &[u8]) -> DocumentRequest {
        DocumentRequest::new(
            DocData::Bytes(payload.to_vec()),
            DocFlavor::new("text/plain", DataRepr::Bytes),
            PrintAttributes::new(),
        )
    }

    #[test]
    fn direct_delivery_for_native_flavor() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let job = job_with(None, Arc::clone(&received), 64);
        let request = DocumentRequest::new(
            DocData::Bytes(b"%!PS-Adobe-3.0\n".to_vec()),
            DocFlavor::new("application/postscript", DataRepr::Stream),
            PrintAttributes::new(),
        );
        let ticket = job.print(request).expect("print");
        assert_eq!(ticket.state, JobState::Done);
        assert_eq!(received.lock().expect("lock").as_slice(), b"%!PS-Adobe-3.0\n");
    }

    #[test]
    fn pipelined_delivery_converts_and_completes() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let job = job_with(None, Arc::clone(&received), 8);
        assert_eq!(job.state(), JobState::Idle);

        let ticket = job.print(text_request(b"hello pipeline")).expect("print");
        assert_eq!(ticket.state, JobState::Done);
        assert!(ticket.error_message.is_none());
        assert_eq!(job.state(), JobState::Done);
        assert_eq!(received.lock().expect("lock").as_slice(), b"HELLO PIPELINE");
    }

    #[test]
    fn small_window_handles_large_documents() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let job = job_with(None, Arc::clone(&received), 4);
        let payload = vec![b'x'; 64 * 1024];
        let ticket = job.print(text_request(&payload)).expect("print");
        assert_eq!(ticket.state, JobState::Done);
        assert_eq!(received.lock().expect("lock").len(), payload.len());
    }

    #[test]
    fn converter_failure_wins_over_foreground_outcome() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let job = job_with(Some(3), Arc::clone(&received), 4);
        let ticket = job.print(text_request(b"partial")).expect("print");
        assert_eq!(ticket.state, JobState::Failed);
        // The foreground saw a clean end-of-stream, yet the job reports
        // the converter's failure.
        assert!(ticket.error_message.as_deref().is_some_and(|m| m.contains("boom")));
        assert_eq!(job.state(), JobState::Failed);
    }

    #[test]
    fn png_submission_arrives_as_postscript() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let received = Arc::new(Mutex::new(Vec::new()));
        let client = Arc::new(CollectingClient {
            received: Arc::clone(&received),
        });
        let factory = crate::ps_factory::PsConverterFactory::new(SpoolConfig::default());
        let lookup = StaticFactoryLookup::new(vec![Arc::new(factory)]);
        let job = SpoolJob::new(
            client,
            ConverterRegistry::new(Arc::new(lookup)),
            SpoolConfig::default(),
        );

        let img = image::DynamicImage::new_rgb8(2, 2);
        let mut encoded = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut encoded),
            image::ImageFormat::Png,
        )
        .expect("encode");

        let ticket = job
            .print(DocumentRequest::new(
                DocData::Bytes(encoded),
                DocFlavor::new("image/png", DataRepr::Bytes),
                PrintAttributes::new(),
            ))
            .expect("print");
        assert_eq!(ticket.state, JobState::Done);
        assert!(ticket.document_hash.is_some());

        let output = String::from_utf8(received.lock().expect("lock").clone()).expect("utf8");
        assert!(output.starts_with("%!PS-Adobe-3.0"));
        assert!(output.contains("false 3 colorimage"));
        assert!(output.trim_end().ends_with("%%EOF"));
    }

    #[test]
    fn second_submission_is_rejected() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let job = job_with(None, Arc::clone(&received), 8);
        job.print(text_request(b"first")).expect("print");
        let err = job.print(text_request(b"second")).expect_err("rejected");
        assert!(matches!(err, StreampressError::JobAlreadyActive));
    }

    #[test]
    fn concurrent_submission_rejected_without_disturbing_inflight_job() {
        use std::sync::mpsc;

        // Client whose delivery blocks on a gate, so the first job is
        // verifiably in flight when the second submission arrives.
        struct GatedClient {
            received: Arc<Mutex<Vec<u8>>>,
            hooks: Mutex<Option<(mpsc::Sender<()>, mpsc::Receiver<()>)>>,
        }

        impl OutputClient for GatedClient {
            fn supported_flavors(&self) -> Vec<DocFlavor> {
                vec![ps_stream()]
            }

            fn supported_attribute_categories(&self) -> Vec<AttributeCategory> {
                Vec::new()
            }

            fn default_attribute_value(&self, _category: AttributeCategory) -> Option<Attribute> {
                None
            }

            fn supported_attribute_values(
                &self,
                _category: AttributeCategory,
                _flavor: Option<&DocFlavor>,
                _attrs: &PrintAttributes,
            ) -> Vec<Attribute> {
                Vec::new()
            }

            fn create_job(&self) -> Box<dyn ClientJob> {
                struct Gated {
                    received: Arc<Mutex<Vec<u8>>>,
                    started: mpsc::Sender<()>,
                    gate: mpsc::Receiver<()>,
                }
                impl ClientJob for Gated {
                    fn print(&mut self, request: &mut DocumentRequest) -> Result<()> {
                        let DocData::Bytes(bytes) = &request.data else {
                            unreachable!("test submits bytes");
                        };
                        let bytes = bytes.clone();
                        self.started.send(()).expect("signal start");
                        self.gate.recv().expect("await release");
                        self.received.lock().expect("lock").extend(bytes);
                        Ok(())
                    }
                }
                let (started, gate) = self
                    .hooks
                    .lock()
                    .expect("lock")
                    .take()
                    .expect("one job per test");
                Box::new(Gated {
                    received: Arc::clone(&self.received),
                    started,
                    gate,
                })
            }
        }

        let (started_tx, started_rx) = mpsc::channel();
        let (gate_tx, gate_rx) = mpsc::channel();
        let received = Arc::new(Mutex::new(Vec::new()));
        let client = Arc::new(GatedClient {
            received: Arc::clone(&received),
            hooks: Mutex::new(Some((started_tx, gate_rx))),
        });
        let registry = ConverterRegistry::new(Arc::new(StaticFactoryLookup::new(Vec::new())));
        let job = Arc::new(SpoolJob::new(client, registry, SpoolConfig::default()));

        let first = {
            let job = Arc::clone(&job);
            thread::spawn(move || {
                job.print(DocumentRequest::new(
                    DocData::Bytes(b"inflight".to_vec()),
                    ps_stream(),
                    PrintAttributes::new(),
                ))
            })
        };
        started_rx.recv().expect("first delivery running");
        assert_eq!(job.state(), JobState::Busy);

        let err = job
            .print(DocumentRequest::new(
                DocData::Bytes(b"intruder".to_vec()),
                ps_stream(),
                PrintAttributes::new(),
            ))
            .expect_err("rejected while busy");
        assert!(matches!(err, StreampressError::JobAlreadyActive));

        gate_tx.send(()).expect("release gate");
        let ticket = first.join().expect("join").expect("first print");
        assert_eq!(ticket.state, JobState::Done);
        assert_eq!(received.lock().expect("lock").as_slice(), b"inflight");
    }

    #[test]
    fn bridged_request_carries_negotiated_target_flavor() {
        // Client declaring its native PostScript as byte-backed: the
        // delivered descriptor must still equal that declared flavor.
        let native = DocFlavor::new("application/postscript", DataRepr::Bytes);

        struct FlavorClient {
            native: DocFlavor,
            seen: Arc<Mutex<Option<DocFlavor>>>,
        }

        impl OutputClient for FlavorClient {
            fn supported_flavors(&self) -> Vec<DocFlavor> {
                vec![self.native.clone()]
            }

            fn supported_attribute_categories(&self) -> Vec<AttributeCategory> {
                Vec::new()
            }

            fn default_attribute_value(&self, _category: AttributeCategory) -> Option<Attribute> {
                None
            }

            fn supported_attribute_values(
                &self,
                _category: AttributeCategory,
                _flavor: Option<&DocFlavor>,
                _attrs: &PrintAttributes,
            ) -> Vec<Attribute> {
                Vec::new()
            }

            fn create_job(&self) -> Box<dyn ClientJob> {
                struct Recorder {
                    seen: Arc<Mutex<Option<DocFlavor>>>,
                }
                impl ClientJob for Recorder {
                    fn print(&mut self, request: &mut DocumentRequest) -> Result<()> {
                        *self.seen.lock().expect("lock") = Some(request.flavor.clone());
                        if let DocData::Stream(s) = &mut request.data {
                            let mut sink = Vec::new();
                            s.read_to_end(&mut sink)?;
                        }
                        Ok(())
                    }
                }
                Box::new(Recorder {
                    seen: Arc::clone(&self.seen),
                })
            }
        }

        let seen = Arc::new(Mutex::new(None));
        let client = Arc::new(FlavorClient {
            native: native.clone(),
            seen: Arc::clone(&seen),
        });
        let lookup =
            StaticFactoryLookup::new(vec![Arc::new(UppercaseFactory { fail_after: None })]);
        let job = SpoolJob::new(
            client,
            ConverterRegistry::new(Arc::new(lookup)),
            SpoolConfig::default(),
        );

        let ticket = job.print(text_request(b"payload")).expect("print");
        assert_eq!(ticket.state, JobState::Done);
        assert_eq!(seen.lock().expect("lock").clone(), Some(native));
    }

    #[test]
    fn unsupported_format_is_refused_and_job_consumed() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let job = job_with(None, received, 8);
        let request = DocumentRequest::new(
            DocData::Bytes(Vec::new()),
            pages_flavor(),
            PrintAttributes::new(),
        );
        let err = job.print(request).expect_err("refused");
        assert!(matches!(err, StreampressError::UnsupportedFormat(_)));
        assert_eq!(job.state(), JobState::Failed);
    }
}
