//! Posting the pipeline to the analysis service.
//!
//! The request runs on its own thread and the outcome comes back over a
//! channel that the UI polls once per frame.

use crate::graph::{NodeData, PipelineGraph};
use crossbeam_channel::{Receiver, unbounded};
use serde::{Deserialize, Serialize};
use std::thread;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct PayloadPosition {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct PayloadNode {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub node_type: String,
    pub position: PayloadPosition,
    pub data: NodeData,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct PayloadEdge {
    pub id: String,
    pub source: Uuid,
    pub target: Uuid,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct PipelinePayload {
    pub nodes: Vec<PayloadNode>,
    pub edges: Vec<PayloadEdge>,
}

impl PipelinePayload {
    /// Snapshot of the graph in wire form. Nodes are listed back to front.
    pub fn from_graph(graph: &PipelineGraph) -> Self {
        let nodes = graph
            .nodes_by_z_order()
            .into_iter()
            .map(|node| PayloadNode {
                id: node.id,
                node_type: node.node_type.clone(),
                position: PayloadPosition {
                    x: node.position.0,
                    y: node.position.1,
                },
                data: node.data.clone(),
            })
            .collect();
        let edges = graph
            .edges
            .iter()
            .map(|edge| PayloadEdge {
                id: edge.id.clone(),
                source: edge.source,
                target: edge.target,
            })
            .collect();
        Self { nodes, edges }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PipelineSummary {
    pub num_nodes: usize,
    pub num_edges: usize,
    pub is_dag: bool,
}

impl PipelineSummary {
    pub fn message(&self) -> String {
        format!(
            "Nodes: {}\nEdges: {}\nDAG: {}",
            self.num_nodes,
            self.num_edges,
            if self.is_dag { "Yes" } else { "No" }
        )
    }
}

/// Text shown to the user for a finished submission.
pub fn outcome_message(outcome: &anyhow::Result<PipelineSummary>) -> String {
    match outcome {
        Ok(summary) => summary.message(),
        Err(err) => format!("Error: {:#}", err),
    }
}

fn post(
    client: &reqwest::blocking::Client,
    url: &str,
    payload: &PipelinePayload,
) -> anyhow::Result<PipelineSummary> {
    let summary = client
        .post(url)
        .json(payload)
        .send()?
        .error_for_status()?
        .json::<PipelineSummary>()?;
    Ok(summary)
}

/// Handle to one in-flight submission.
pub struct Submission {
    receiver: Receiver<anyhow::Result<PipelineSummary>>,
}

impl Submission {
    pub fn start(url: String, payload: PipelinePayload) -> Self {
        Self::start_with(reqwest::blocking::Client::new(), url, payload)
    }

    pub fn start_with(client: reqwest::blocking::Client, url: String, payload: PipelinePayload) -> Self {
        let (tx, rx) = unbounded();
        log::info!(
            "submitting {} nodes, {} edges to {}",
            payload.nodes.len(),
            payload.edges.len(),
            url
        );
        thread::spawn(move || {
            let outcome = post(&client, &url, &payload);
            if let Err(err) = &outcome {
                log::warn!("submission failed: {:#}", err);
            }
            let _ = tx.send(outcome);
        });
        Self { receiver: rx }
    }

    /// The outcome once the request has finished.
    pub fn poll(&self) -> Option<anyhow::Result<PipelineSummary>> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;

    #[test]
    fn test_payload_shape() {
        let mut graph = PipelineGraph::default();
        let a = graph.add_node("customInput", (10.0, 20.0), 0);
        let b = graph.add_node("customOutput", (300.0, 20.0), 1);
        graph.set_field(&a, "inputName", "question");
        graph.connect(Edge::new(a, "value", b, "value"));

        let json = serde_json::to_value(PipelinePayload::from_graph(&graph)).unwrap();
        let nodes = json["nodes"].as_array().unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0]["id"], a.to_string());
        assert_eq!(nodes[0]["type"], "customInput");
        assert_eq!(nodes[0]["position"]["x"], 10.0);
        assert_eq!(nodes[0]["position"]["y"], 20.0);
        assert_eq!(nodes[0]["data"]["inputName"], "question");

        let edges = json["edges"].as_array().unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0]["source"], a.to_string());
        assert_eq!(edges[0]["target"], b.to_string());
        assert!(edges[0].get("source_handle").is_none());
    }

    #[test]
    fn test_summary_decoding_and_message() {
        let summary: PipelineSummary =
            serde_json::from_str(r#"{"num_nodes": 3, "num_edges": 2, "is_dag": true}"#).unwrap();
        assert_eq!(summary.message(), "Nodes: 3\nEdges: 2\nDAG: Yes");

        let cyclic = PipelineSummary {
            is_dag: false,
            ..summary
        };
        assert!(cyclic.message().ends_with("DAG: No"));
    }

    #[test]
    fn test_error_message() {
        let outcome: anyhow::Result<PipelineSummary> = Err(anyhow::anyhow!("connection refused"));
        assert_eq!(outcome_message(&outcome), "Error: connection refused");
    }

    fn local_client() -> reqwest::blocking::Client {
        reqwest::blocking::Client::builder().no_proxy().build().unwrap()
    }

    /// Serves one HTTP request on a local port with the given status line and
    /// body, returning the URL to post to.
    fn serve_once(status: &'static str, body: &'static str) -> String {
        use std::io::{BufRead, BufReader, Read, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                let lower = line.to_ascii_lowercase();
                if let Some(value) = lower.strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
            }
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let mut stream = reader.into_inner();
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
        });
        format!("http://{}/pipelines/parse", addr)
    }

    #[test]
    fn test_post_decodes_summary() {
        let url = serve_once("200 OK", r#"{"num_nodes": 2, "num_edges": 1, "is_dag": true}"#);
        let summary = post(&local_client(), &url, &PipelinePayload::from_graph(&PipelineGraph::default())).unwrap();
        assert_eq!(
            summary,
            PipelineSummary {
                num_nodes: 2,
                num_edges: 1,
                is_dag: true
            }
        );
    }

    #[test]
    fn test_post_error_status() {
        let url = serve_once("500 Internal Server Error", r#"{"detail": "boom"}"#);
        let outcome = post(&local_client(), &url, &PipelinePayload::from_graph(&PipelineGraph::default()));
        let message = outcome_message(&outcome);
        assert!(message.starts_with("Error: "), "{}", message);
        assert!(message.contains("500"), "{}", message);
    }

    #[test]
    fn test_post_undecodable_body() {
        let url = serve_once("200 OK", r#"{"nodes": 2}"#);
        let outcome = post(&local_client(), &url, &PipelinePayload::from_graph(&PipelineGraph::default()));
        assert!(outcome_message(&outcome).starts_with("Error: "));
    }

    #[test]
    fn test_submission_reports_over_channel() {
        let url = serve_once("200 OK", r#"{"num_nodes": 0, "num_edges": 0, "is_dag": true}"#);
        let submission = Submission::start_with(
            local_client(),
            url,
            PipelinePayload::from_graph(&PipelineGraph::default()),
        );
        let outcome = submission
            .receiver
            .recv_timeout(std::time::Duration::from_secs(10))
            .unwrap();
        assert_eq!(outcome_message(&outcome), "Nodes: 0\nEdges: 0\nDAG: Yes");
    }
}
